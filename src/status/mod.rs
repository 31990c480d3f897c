//! Object status resolution
//!
//! Computes a node's health classification and human-readable details.
//! Two layers are combined:
//! - built-in checkers registered per group/kind (`pod`, `service`, ...)
//! - plugin overlays, whose non-empty status overrides the built-in one and
//!   whose details are appended after the built-in details

pub mod ingress;
pub mod pod;
pub mod replication_controller;
pub mod service;
pub mod workload;

use async_trait::async_trait;
use kube::ResourceExt;
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cluster::{ObjectStore, StoreError};
use crate::graph::{Component, NodeStatus};
use crate::models::{GroupKind, ObjectExt, ResourceKind, typed};
use crate::plugins::{PluginError, PluginManager, PluginStatus};

pub use ingress::IngressChecker;
pub use pod::PodChecker;
pub use replication_controller::ReplicationControllerChecker;
pub use service::ServiceChecker;
pub use workload::WorkloadChecker;

/// Status classification plus detail components for one object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectStatus {
    pub node_status: NodeStatus,
    pub details: Vec<Component>,
}

impl ObjectStatus {
    pub fn new(node_status: NodeStatus, details: Vec<Component>) -> Self {
        Self {
            node_status,
            details,
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(NodeStatus::Ok, vec![Component::text(message)])
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NodeStatus::Warning, vec![Component::text(message)])
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NodeStatus::Error, vec![Component::text(message)])
    }

    /// Apply a plugin overlay: a non-empty status wins, details are appended
    pub fn apply_overlay(&mut self, overlay: PluginStatus) {
        if let Some(status) = overlay.status {
            self.node_status = status;
        }
        self.details.extend(overlay.details);
    }
}

/// Status resolution errors
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("object is nil")]
    MissingObject,

    #[error("not a {expected}")]
    WrongKind { expected: &'static str },

    #[error("unable to convert {kind} {name}: {source}")]
    Conversion {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to look up {target} for {kind} {name}: {source}")]
    Lookup {
        kind: String,
        name: String,
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("plugin status for {kind} {name} failed: {source}")]
    Plugin {
        kind: String,
        name: String,
        #[source]
        source: PluginError,
    },
}

impl StatusError {
    pub(crate) fn lookup(object: &DynamicObject, target: String, source: StoreError) -> Self {
        StatusError::Lookup {
            kind: object.object_kind().to_string(),
            name: object.name_any(),
            target,
            source,
        }
    }
}

/// Convert a dynamic object into a typed Kubernetes object without checking its kind
pub fn convert<K: DeserializeOwned>(object: &DynamicObject) -> Result<K, StatusError> {
    let conversion = |source| StatusError::Conversion {
        kind: object.object_kind().to_string(),
        name: object.name_any(),
        source,
    };
    typed(object).map_err(conversion)
}

/// Convert a dynamic object into the typed object for `kind`, rejecting
/// empty objects and objects of another kind
pub fn parse_as<K: DeserializeOwned>(
    object: &DynamicObject,
    kind: ResourceKind,
) -> Result<K, StatusError> {
    if object.is_empty_object() {
        return Err(StatusError::MissingObject);
    }
    if !object.is_kind(kind) {
        return Err(StatusError::WrongKind {
            expected: kind.as_str(),
        });
    }
    convert(object)
}

/// Capability used by the graph renderers to classify objects
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusResolver: Send + Sync {
    async fn status(&self, object: &DynamicObject) -> Result<ObjectStatus, StatusError>;
}

/// Built-in status rule for one kind
#[async_trait]
pub trait KindStatus: Send + Sync {
    async fn status(
        &self,
        object: &DynamicObject,
        store: &dyn ObjectStore,
    ) -> Result<ObjectStatus, StatusError>;
}

/// Status resolver backed by a group/kind → checker table and an optional
/// plugin overlay
pub struct Resolver {
    store: Arc<dyn ObjectStore>,
    checkers: HashMap<GroupKind, Arc<dyn KindStatus>>,
    plugins: Option<Arc<PluginManager>>,
}

impl Resolver {
    /// Create a resolver with every built-in checker registered
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        let mut resolver = Self::empty(store);
        resolver.register(ResourceKind::Pod, Arc::new(PodChecker));
        resolver.register(ResourceKind::Service, Arc::new(ServiceChecker));
        resolver.register(ResourceKind::Ingress, Arc::new(IngressChecker));
        resolver.register(
            ResourceKind::ReplicationController,
            Arc::new(ReplicationControllerChecker),
        );
        for kind in WorkloadChecker::KINDS {
            resolver.register(*kind, Arc::new(WorkloadChecker::new(*kind)));
        }
        resolver
    }

    /// Create a resolver without any checkers
    pub fn empty(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            checkers: HashMap::new(),
            plugins: None,
        }
    }

    /// Attach a plugin manager whose overlays are merged into every status
    pub fn with_plugins(mut self, plugins: Arc<PluginManager>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    /// Register a checker for every group a well-known kind is served from
    pub fn register(&mut self, kind: ResourceKind, checker: Arc<dyn KindStatus>) {
        for gk in kind.group_kinds() {
            self.checkers.insert(gk, checker.clone());
        }
    }

    /// Register a checker for an arbitrary group/kind (e.g. a custom resource)
    pub fn register_group_kind(&mut self, gk: GroupKind, checker: Arc<dyn KindStatus>) {
        self.checkers.insert(gk, checker);
    }

    /// Status from the built-in table only. Kinds without a checker are OK
    /// with no details.
    pub async fn builtin_status(
        &self,
        object: &DynamicObject,
    ) -> Result<ObjectStatus, StatusError> {
        match self.checkers.get(&object.group_kind()) {
            Some(checker) => checker.status(object, self.store.as_ref()).await,
            None => Ok(ObjectStatus::default()),
        }
    }
}

#[async_trait]
impl StatusResolver for Resolver {
    async fn status(&self, object: &DynamicObject) -> Result<ObjectStatus, StatusError> {
        if object.is_empty_object() {
            return Err(StatusError::MissingObject);
        }

        let mut status = self.builtin_status(object).await?;

        if let Some(plugins) = &self.plugins {
            let overlay = plugins
                .plugin_status(object)
                .await
                .map_err(|source| StatusError::Plugin {
                    kind: object.object_kind().to_string(),
                    name: object.name_any(),
                    source,
                })?;
            status.apply_overlay(overlay);
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemoryStore;
    use crate::models::object_from_value;
    use crate::plugins::testing::FakePlugin;
    use serde_json::json;

    fn running_pod() -> DynamicObject {
        object_from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web-a", "namespace": "default", "uid": "p-1"},
            "status": {"phase": "Running"}
        }))
        .unwrap()
    }

    fn overlay_plugin(status: Option<NodeStatus>, detail: &str) -> FakePlugin {
        FakePlugin::returning(PluginStatus {
            status,
            details: vec![Component::text(detail)],
        })
    }

    #[tokio::test]
    async fn test_builtin_status_for_registered_kind() {
        let resolver = Resolver::new(Arc::new(MemoryStore::new()));
        let status = resolver.status(&running_pod()).await.unwrap();
        assert_eq!(status, ObjectStatus::ok("Pod is OK"));
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_ok_without_details() {
        let resolver = Resolver::new(Arc::new(MemoryStore::new()));
        let widget = object_from_value(json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": "w", "namespace": "default"}
        }))
        .unwrap();

        let status = resolver.status(&widget).await.unwrap();
        assert_eq!(status.node_status, NodeStatus::Ok);
        assert!(status.details.is_empty());
    }

    struct WidgetChecker;

    #[async_trait]
    impl KindStatus for WidgetChecker {
        async fn status(
            &self,
            object: &DynamicObject,
            _store: &dyn ObjectStore,
        ) -> Result<ObjectStatus, StatusError> {
            match object.data["status"]["ready"].as_bool() {
                Some(true) => Ok(ObjectStatus::ok("Widget is ready")),
                _ => Ok(ObjectStatus::warning("Widget is not ready")),
            }
        }
    }

    fn widget(api_version: &str) -> DynamicObject {
        object_from_value(json!({
            "apiVersion": api_version,
            "kind": "Widget",
            "metadata": {"name": "w", "namespace": "default"},
            "status": {"ready": false}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_custom_resource_checker() {
        let mut resolver = Resolver::new(Arc::new(MemoryStore::new()));
        resolver.register_group_kind(
            GroupKind::new("example.com", "Widget"),
            Arc::new(WidgetChecker),
        );

        let status = resolver.status(&widget("example.com/v1")).await.unwrap();
        assert_eq!(status, ObjectStatus::warning("Widget is not ready"));

        // same kind served from another group has no checker
        let status = resolver.status(&widget("other.io/v1")).await.unwrap();
        assert_eq!(status.node_status, NodeStatus::Ok);
        assert!(status.details.is_empty());
    }

    #[tokio::test]
    async fn test_empty_object_is_rejected() {
        let resolver = Resolver::new(Arc::new(MemoryStore::new()));
        let empty = object_from_value(json!({"metadata": {}})).unwrap();
        let err = resolver.status(&empty).await.unwrap_err();
        assert_eq!(err.to_string(), "object is nil");
    }

    #[tokio::test]
    async fn test_plugin_status_overrides_and_details_append() {
        let mut manager = PluginManager::new();
        manager.register(Arc::new(overlay_plugin(
            Some(NodeStatus::Warning),
            "Flagged by policy",
        )));
        let resolver =
            Resolver::new(Arc::new(MemoryStore::new())).with_plugins(Arc::new(manager));

        let status = resolver.status(&running_pod()).await.unwrap();
        assert_eq!(status.node_status, NodeStatus::Warning);
        assert_eq!(
            status.details,
            vec![
                Component::text("Pod is OK"),
                Component::text("Flagged by policy")
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_plugin_status_keeps_builtin() {
        let mut manager = PluginManager::new();
        manager.register(Arc::new(overlay_plugin(None, "Scanned")));
        let resolver =
            Resolver::new(Arc::new(MemoryStore::new())).with_plugins(Arc::new(manager));

        let status = resolver.status(&running_pod()).await.unwrap();
        assert_eq!(status.node_status, NodeStatus::Ok);
        assert_eq!(status.details.len(), 2);
    }

    #[tokio::test]
    async fn test_plugin_error_propagates() {
        let plugin = FakePlugin::failing("connection refused");
        let mut manager = PluginManager::new();
        manager.register(Arc::new(plugin));
        let resolver =
            Resolver::new(Arc::new(MemoryStore::new())).with_plugins(Arc::new(manager));

        let err = resolver.status(&running_pod()).await.unwrap_err();
        assert!(matches!(err, StatusError::Plugin { .. }));
        assert!(err.to_string().contains("Pod web-a"));
    }

    #[test]
    fn test_parse_as_rejects_other_kind() {
        let err = parse_as::<k8s_openapi::api::core::v1::Service>(
            &running_pod(),
            ResourceKind::Service,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "not a Service");
    }
}
