//! Cluster access
//!
//! Client bootstrap, the read-only `ObjectStore` abstraction and the
//! relationship traversal that feeds the graph handler.

pub mod store;
pub mod visitor;

pub use store::{KubeStore, MemoryStore, ObjectKey, ObjectStore, StoreError};
pub use visitor::{ObjectHandler, OwnerVisitor, VisitError};

use anyhow::{Context, Result};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use url::Url;

/// Create a Kubernetes client
///
/// Uses the default kubeconfig loading strategy (in-cluster config,
/// `KUBECONFIG`, `~/.kube/config`) unless a context is named. A proxy
/// configured in the kubeconfig is ignored for private cluster hosts.
pub async fn create_client(context: Option<&str>) -> Result<Client> {
    let mut config = match context {
        Some(context) => {
            let options = KubeConfigOptions {
                context: Some(context.to_string()),
                ..Default::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context {}", context))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    if let Ok(url) = Url::parse(&config.cluster_url.to_string()) {
        if let Some(host) = url.host_str() {
            if config.proxy_url.is_some() && is_internal_host(host) {
                tracing::debug!("Bypassing proxy for internal cluster host {}", host);
                config.proxy_url = None;
            }
        }
    }

    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Private addresses and cluster-internal domains
fn is_internal_host(host: &str) -> bool {
    let private_prefix = ["10.", "192.168.", "127."]
        .iter()
        .any(|prefix| host.starts_with(prefix))
        || is_private_172(host);

    private_prefix
        || matches!(host, "localhost" | "::1")
        || [".local", ".internal", ".cluster.local"]
            .iter()
            .any(|suffix| host.ends_with(suffix))
}

fn is_private_172(host: &str) -> bool {
    let mut octets = host.split('.');
    octets.next() == Some("172")
        && octets
            .next()
            .and_then(|second| second.parse::<u8>().ok())
            .is_some_and(|second| (16..=31).contains(&second))
}
