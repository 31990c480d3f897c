//! Status resolution tests
//!
//! Runs the built-in checkers and the plugin overlay against objects served
//! from a `MemoryStore`, and checks how statuses surface in the graph.

use resview::cluster::MemoryStore;
use resview::config::Config;
use resview::graph::{Component, NodeStatus};
use resview::plugins::{FileStatusPlugin, PluginManager};
use resview::services::ResourceViewer;
use resview::status::{ObjectStatus, Resolver, StatusResolver};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const SERVICE: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: api
  namespace: shop
  uid: svc-1
spec:
  selector:
    app: api
  ports:
    - name: http
      port: 80
---
apiVersion: v1
kind: Pod
metadata:
  name: api-0
  namespace: shop
  uid: p-1
  labels:
    app: api
spec:
  containers:
    - name: app
      image: api:1.0
status:
  phase: Running
"#;

const ENDPOINTS: &str = r#"
apiVersion: v1
kind: Endpoints
metadata:
  name: api
  namespace: shop
subsets:
  - addresses:
      - ip: 10.0.0.12
"#;

fn store(with_endpoints: bool) -> Arc<MemoryStore> {
    let mut content = SERVICE.to_string();
    if with_endpoints {
        content.push_str("---");
        content.push_str(ENDPOINTS);
    }
    Arc::new(MemoryStore::from_manifests(&content, None).unwrap())
}

#[tokio::test]
async fn test_service_without_endpoints_warns() {
    let store = store(false);
    let service = store.find("v1", "Service", Some("shop"), "api").unwrap().clone();

    let status = Resolver::new(store.clone()).status(&service).await.unwrap();
    assert_eq!(status, ObjectStatus::warning("Service has no endpoints"));
}

#[tokio::test]
async fn test_service_with_endpoints_is_ok() {
    let store = store(true);
    let service = store.find("v1", "Service", Some("shop"), "api").unwrap().clone();

    let status = Resolver::new(store.clone()).status(&service).await.unwrap();
    assert_eq!(status, ObjectStatus::ok("Service is OK"));
}

#[tokio::test]
async fn test_kind_without_checker_is_ok_without_details() {
    let store = store(true);
    let endpoints = store.find("v1", "Endpoints", Some("shop"), "api").unwrap().clone();

    let status = Resolver::new(store.clone()).status(&endpoints).await.unwrap();
    assert_eq!(status, ObjectStatus::default());
}

#[tokio::test]
async fn test_service_graph_shows_warning() {
    let store = store(false);
    let service = store.find("v1", "Service", Some("shop"), "api").unwrap().clone();
    let viewer = ResourceViewer::from_config(store.clone(), &Config::default(), None);

    let component = viewer.visit(&service, &CancellationToken::new()).await.unwrap();

    let node = &component.nodes["svc-1"];
    assert_eq!(node.status, NodeStatus::Warning);
    assert_eq!(node.details, vec![Component::text("Service has no endpoints")]);

    // an ownerless pod stays a single node
    assert_eq!(component.nodes["p-1"].status, NodeStatus::Ok);
    assert_eq!(component.edge_count(), 1);
    assert_eq!(component.edges["svc-1"][0].node, "p-1");
}

#[tokio::test]
async fn test_plugin_overlay_overrides_builtin_status() {
    let store = store(true);
    let service = store.find("v1", "Service", Some("shop"), "api").unwrap().clone();

    let plugin = FileStatusPlugin::from_yaml(
        "policy",
        r#"
rules:
  - kind: Service
    name: api
    status: error
    details: ["Exposed without network policy"]
  - kind: Service
    namespace: other
    details: ["Not applied"]
"#,
    )
    .unwrap();
    let mut plugins = PluginManager::new();
    plugins.register(Arc::new(plugin));

    let resolver = Resolver::new(store.clone()).with_plugins(Arc::new(plugins));
    let status = resolver.status(&service).await.unwrap();

    assert_eq!(status.node_status, NodeStatus::Error);
    assert_eq!(
        status.details,
        vec![
            Component::text("Service is OK"),
            Component::text("Exposed without network policy"),
        ]
    );
}

#[tokio::test]
async fn test_plugin_ignores_other_kinds() {
    let store = store(true);
    let pod = store.find("v1", "Pod", Some("shop"), "api-0").unwrap().clone();

    let plugin = FileStatusPlugin::from_yaml(
        "policy",
        "rules:\n  - kind: Service\n    status: error\n",
    )
    .unwrap();
    let mut plugins = PluginManager::new();
    plugins.register(Arc::new(plugin));

    let resolver = Resolver::new(store.clone()).with_plugins(Arc::new(plugins));
    let status = resolver.status(&pod).await.unwrap();
    assert_eq!(status, ObjectStatus::ok("Pod is OK"));
}
