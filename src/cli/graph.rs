//! Graph command handler

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use resview::cluster::{KubeStore, MemoryStore, ObjectKey, ObjectStore, create_client};
use resview::config::Config;
use resview::graph::identify;
use resview::models::ResourceKind;
use resview::plugins::file::load_plugins;
use resview::services::ResourceViewer;

/// Arguments of the `graph` subcommand
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// API version of the starting object (e.g. "apps/v1")
    pub api_version: String,
    /// Kind of the starting object (e.g. "Deployment", short names like "deploy" work)
    pub kind: String,
    /// Name of the starting object
    pub name: String,
    /// Namespace of the starting object (defaults to defaultNamespace)
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,
    /// Read objects from a multi-document YAML file instead of the cluster
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,
    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,
    /// Node id to select instead of the starting object
    #[arg(long)]
    pub select: Option<String>,
    /// Render every pod as its own node
    #[arg(long)]
    pub no_group: bool,
    /// Print the component as single-line JSON
    #[arg(long)]
    pub compact: bool,
}

/// Build the graph around one object and print it as JSON
pub async fn handle_graph_command(args: GraphArgs, config: &Config) -> Result<()> {
    let namespace = args
        .namespace
        .clone()
        .unwrap_or_else(|| config.default_namespace.clone());

    let store: Arc<dyn ObjectStore> = match &args.file {
        Some(path) => {
            tracing::debug!("Loading objects from {}", path.display());
            let store = MemoryStore::from_file(path, Some(&namespace))
                .with_context(|| format!("Failed to load manifests from {}", path.display()))?;
            Arc::new(store)
        }
        None => {
            tracing::debug!("Initializing Kubernetes client");
            let client = create_client(args.context.as_deref()).await?;
            Arc::new(KubeStore::new(client))
        }
    };

    let kind = ResourceKind::from_str_case_insensitive(&args.kind)
        .map(|kind| kind.as_str().to_string())
        .unwrap_or_else(|| args.kind.clone());

    let key = ObjectKey::new(Some(&namespace), &args.api_version, &kind, &args.name);
    let object = store
        .get(&key)
        .await
        .with_context(|| format!("Failed to get {} {}", kind, args.name))?
        .with_context(|| format!("{} {}/{} not found", kind, namespace, args.name))?;

    let plugins = load_plugins(&config.plugins)
        .await
        .context("Failed to load status plugins")?;
    if !plugins.is_empty() {
        tracing::debug!("Loaded status plugins: {:?}", plugins.names());
    }

    let viewer = ResourceViewer::from_config(store, config, Some(Arc::new(plugins)))
        .with_pod_grouping(config.group_pods && !args.no_group);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupted, cancelling graph build");
            interrupt.cancel();
        }
    });

    let selected = args.select.clone().unwrap_or_else(|| identify(&object));
    let component = viewer.visit_selecting(&object, &selected, &cancel).await?;

    let json = if args.compact {
        serde_json::to_string(&component)
    } else {
        serde_json::to_string_pretty(&component)
    }
    .context("Failed to serialize resource viewer")?;
    println!("{}", json);

    Ok(())
}
