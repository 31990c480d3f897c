//! Resource viewer service
//!
//! Runs one traversal against a fresh graph handler and returns the exported
//! component. One handler per request; nothing is shared between builds.

use anyhow::{Context, Result};
use kube::ResourceExt;
use kube::core::DynamicObject;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cluster::{ObjectStore, OwnerVisitor};
use crate::config::Config;
use crate::graph::{Handler, ResourceViewerComponent, identify};
use crate::link::{LinkResolver, ObjectPathResolver};
use crate::models::ObjectExt;
use crate::plugins::PluginManager;
use crate::status::{Resolver, StatusResolver};

/// Builds resource viewer graphs for objects in a store
pub struct ResourceViewer {
    store: Arc<dyn ObjectStore>,
    status: Arc<dyn StatusResolver>,
    links: Arc<dyn LinkResolver>,
    group_pods: bool,
}

impl ResourceViewer {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        status: Arc<dyn StatusResolver>,
        links: Arc<dyn LinkResolver>,
    ) -> Self {
        Self {
            store,
            status,
            links,
            group_pods: true,
        }
    }

    /// Wire the built-in status resolver, optional plugins and the
    /// configured link layout around a store
    pub fn from_config(
        store: Arc<dyn ObjectStore>,
        config: &Config,
        plugins: Option<Arc<PluginManager>>,
    ) -> Self {
        let mut resolver = Resolver::new(store.clone());
        if let Some(plugins) = plugins.filter(|p| !p.is_empty()) {
            resolver = resolver.with_plugins(plugins);
        }
        let links = ObjectPathResolver::new(&config.links.prefix, &config.links.cluster_prefix);

        Self::new(store, Arc::new(resolver), Arc::new(links)).with_pod_grouping(config.group_pods)
    }

    pub fn with_pod_grouping(mut self, enabled: bool) -> Self {
        self.group_pods = enabled;
        self
    }

    /// Build the graph around `object`, selecting it
    pub async fn visit(
        &self,
        object: &DynamicObject,
        cancel: &CancellationToken,
    ) -> Result<ResourceViewerComponent> {
        self.visit_selecting(object, &identify(object), cancel).await
    }

    /// Build the graph around `object` with an explicit selection
    pub async fn visit_selecting(
        &self,
        object: &DynamicObject,
        selected: &str,
        cancel: &CancellationToken,
    ) -> Result<ResourceViewerComponent> {
        let kind = object.object_kind().to_string();
        let name = object.name_any();
        tracing::debug!("Building resource viewer for {} {}", kind, name);

        let handler = Handler::new(self.status.clone(), self.links.clone())
            .with_pod_grouping(self.group_pods);
        let visitor = OwnerVisitor::new(self.store.clone()).with_cancellation(cancel.clone());

        visitor
            .visit(object, &handler)
            .await
            .with_context(|| format!("Failed to visit {} {}", kind, name))?;

        handler
            .component(selected, cancel)
            .await
            .with_context(|| format!("Failed to build resource viewer for {} {}", kind, name))
    }
}
