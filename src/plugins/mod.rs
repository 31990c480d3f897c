// Status overlay plugins
//
// Plugins contribute extra status and detail components for objects they
// recognize. The manager merges every matching plugin's overlay in
// registration order; the resolver then layers the result over the built-in
// status.

pub mod file;

pub use file::{FileStatusPlugin, StatusRule};

use async_trait::async_trait;
use kube::core::DynamicObject;
use std::sync::Arc;

use crate::graph::{Component, NodeStatus};
use crate::models::{GroupKind, ObjectExt};

/// Plugin errors
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Invalid plugin manifest: {0}")]
    InvalidManifest(String),

    #[error("Failed to load plugin: {0}")]
    LoadError(String),

    #[error("Plugin {plugin} failed: {message}")]
    Failed { plugin: String, message: String },
}

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Overlay returned by a plugin. `status: None` leaves the built-in status alone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PluginStatus {
    pub status: Option<NodeStatus>,
    pub details: Vec<Component>,
}

impl PluginStatus {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.details.is_empty()
    }

    /// Fold a later overlay into this one
    pub fn merge(&mut self, other: PluginStatus) {
        if other.status.is_some() {
            self.status = other.status;
        }
        self.details.extend(other.details);
    }
}

/// A provider of status overlays
#[async_trait]
pub trait StatusPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the plugin wants to see objects of this group/kind
    fn handles(&self, gk: &GroupKind) -> bool;

    async fn object_status(&self, object: &DynamicObject) -> PluginResult<PluginStatus>;
}

/// Registered plugins, consulted in registration order
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn StatusPlugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn StatusPlugin>) {
        tracing::debug!("Registered status plugin {}", plugin.name());
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Combined overlay of every plugin handling the object's group/kind.
    /// The first plugin error aborts the merge.
    pub async fn plugin_status(&self, object: &DynamicObject) -> PluginResult<PluginStatus> {
        let gk = object.group_kind();
        let mut merged = PluginStatus::default();

        for plugin in self.plugins.iter().filter(|p| p.handles(&gk)) {
            let overlay = plugin.object_status(object).await?;
            tracing::debug!(
                "Plugin {} returned {:?} with {} details for {}",
                plugin.name(),
                overlay.status,
                overlay.details.len(),
                gk
            );
            merged.merge(overlay);
        }

        Ok(merged)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakePlugin;
    use super::*;
    use crate::models::object_from_value;
    use serde_json::json;

    fn deployment() -> DynamicObject {
        object_from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "default"}
        }))
        .unwrap()
    }

    fn overlay(status: Option<NodeStatus>, detail: &str) -> PluginStatus {
        PluginStatus {
            status,
            details: vec![Component::text(detail)],
        }
    }

    #[tokio::test]
    async fn test_later_status_wins_and_details_accumulate() {
        let mut manager = PluginManager::new();
        manager.register(Arc::new(FakePlugin::returning(overlay(
            Some(NodeStatus::Warning),
            "first",
        ))));
        manager.register(Arc::new(FakePlugin::returning(overlay(None, "second"))));
        manager.register(Arc::new(FakePlugin::returning(overlay(
            Some(NodeStatus::Error),
            "third",
        ))));

        let merged = manager.plugin_status(&deployment()).await.unwrap();
        assert_eq!(merged.status, Some(NodeStatus::Error));
        assert_eq!(
            merged.details,
            vec![
                Component::text("first"),
                Component::text("second"),
                Component::text("third")
            ]
        );
    }

    #[tokio::test]
    async fn test_plugins_for_other_kinds_are_skipped() {
        let mut manager = PluginManager::new();
        manager.register(Arc::new(
            FakePlugin::failing("should not be called").for_kinds(&["Pod"]),
        ));

        let merged = manager.plugin_status(&deployment()).await.unwrap();
        assert!(merged.is_empty());
    }

    #[tokio::test]
    async fn test_plugin_failure_propagates() {
        let mut manager = PluginManager::new();
        manager.register(Arc::new(FakePlugin::failing("timeout")));

        let err = manager.plugin_status(&deployment()).await.unwrap_err();
        assert_eq!(err.to_string(), "Plugin fake failed: timeout");
    }
}
