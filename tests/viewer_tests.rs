//! Cached resource viewer tests
//!
//! Covers the placeholder-then-refresh flow of `CachedResourceViewer`, the
//! single-shot `build_async` builder and cache eviction.

use resview::cluster::MemoryStore;
use resview::config::Config;
use resview::graph::{Component, NodeStatus};
use resview::services::{
    CachedResourceViewer, ComponentCache, ResourceViewer, build_async, cache_key,
};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const MANIFESTS: &str = r#"
apiVersion: apps/v1
kind: StatefulSet
metadata:
  name: db
  namespace: data
  uid: sts-1
spec:
  replicas: 1
  serviceName: db
  selector: {}
  template: {}
status:
  replicas: 1
  readyReplicas: 1
---
apiVersion: v1
kind: Pod
metadata:
  name: db-0
  namespace: data
  uid: p-1
  ownerReferences:
    - apiVersion: apps/v1
      kind: StatefulSet
      name: db
      uid: sts-1
      controller: true
status:
  phase: Running
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
  namespace: data
  uid: cm-1
"#;

const DB_PODS: &str = "pods:4:data:7:apps/v1:11:StatefulSet:2:db";

fn setup() -> (Arc<MemoryStore>, Arc<ResourceViewer>) {
    let store = Arc::new(MemoryStore::from_manifests(MANIFESTS, None).unwrap());
    let viewer = Arc::new(ResourceViewer::from_config(
        store.clone(),
        &Config::default(),
        None,
    ));
    (store, viewer)
}

fn capacity(n: usize) -> Arc<ComponentCache> {
    Arc::new(ComponentCache::new(NonZeroUsize::new(n).unwrap()))
}

#[tokio::test]
async fn test_placeholder_then_cached_graph() {
    let (store, viewer) = setup();
    let cache = capacity(4);
    let cached = CachedResourceViewer::new(viewer, cache.clone());
    let stateful_set = store
        .find("apps/v1", "StatefulSet", Some("data"), "db")
        .unwrap()
        .clone();

    let placeholder = cached.component(&stateful_set).await;
    assert_eq!(placeholder.nodes.len(), 1);
    let loading = placeholder.selected_node().unwrap();
    assert_eq!(loading.status, NodeStatus::Unknown);
    assert_eq!(loading.details, vec![Component::text("Loading")]);

    // the placeholder call started the background build
    for _ in 0..100 {
        if cache.contains(&cache_key(&stateful_set)).await {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let graph = cached.component(&stateful_set).await;
    assert_eq!(graph.selected, "sts-1");
    assert_eq!(graph.nodes[DB_PODS].name, "db pods");
    assert_eq!(
        graph.nodes["sts-1"].details,
        vec![Component::text("Stateful Set is OK")]
    );
}

#[tokio::test]
async fn test_refresh_is_deduplicated_while_pending() {
    let (store, viewer) = setup();
    let cached = CachedResourceViewer::new(viewer, capacity(4));
    let pod = store.find("v1", "Pod", Some("data"), "db-0").unwrap().clone();

    let first = cached.refresh(&pod).await;
    let second = cached.refresh(&pod).await;
    assert!(first.is_some());
    assert!(second.is_none());

    if let Some(handle) = first {
        handle.await.unwrap();
    }
    let graph = cached.component(&pod).await;
    assert_eq!(graph.selected, DB_PODS);
}

#[tokio::test]
async fn test_build_async_returns_key_and_result() {
    let (store, viewer) = setup();
    let config_map = store
        .find("v1", "ConfigMap", Some("data"), "settings")
        .unwrap()
        .clone();

    let (key, rx) = build_async(viewer, config_map, CancellationToken::new());
    assert_eq!(key, "resourceviewer/cm-1");

    let component = rx.await.unwrap().unwrap();
    assert_eq!(component.nodes.len(), 1);
    assert_eq!(component.selected, "cm-1");
    assert_eq!(component.edge_count(), 0);
}

#[tokio::test]
async fn test_build_async_reports_cancellation() {
    let (store, viewer) = setup();
    let pod = store.find("v1", "Pod", Some("data"), "db-0").unwrap().clone();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (_, rx) = build_async(viewer, pod, cancel);
    assert!(rx.await.unwrap().is_err());
}

#[tokio::test]
async fn test_cache_is_bounded() {
    let (store, viewer) = setup();
    let cache = capacity(1);
    let stateful_set = store
        .find("apps/v1", "StatefulSet", Some("data"), "db")
        .unwrap()
        .clone();
    let config_map = store
        .find("v1", "ConfigMap", Some("data"), "settings")
        .unwrap()
        .clone();

    let cancel = CancellationToken::new();
    let first = viewer.visit(&stateful_set, &cancel).await.unwrap();
    let second = viewer.visit(&config_map, &cancel).await.unwrap();
    cache.insert(cache_key(&stateful_set), first).await;
    cache.insert(cache_key(&config_map), second).await;

    assert_eq!(cache.len().await, 1);
    assert!(!cache.contains(&cache_key(&stateful_set)).await);
    assert!(cache.contains(&cache_key(&config_map)).await);
}

#[tokio::test]
async fn test_configured_capacity_bounds_cached_viewer() {
    let (store, viewer) = setup();
    let mut config = Config::default();
    config.cache.capacity = 1;
    let cached = CachedResourceViewer::from_config(viewer, &config);
    assert_eq!(cached.cache().capacity(), 1);

    let stateful_set = store
        .find("apps/v1", "StatefulSet", Some("data"), "db")
        .unwrap()
        .clone();
    let config_map = store
        .find("v1", "ConfigMap", Some("data"), "settings")
        .unwrap()
        .clone();

    for object in [&stateful_set, &config_map] {
        if let Some(handle) = cached.refresh(object).await {
            handle.await.unwrap();
        }
    }

    assert_eq!(cached.cache().len().await, 1);
    assert!(cached.cache().contains(&cache_key(&config_map)).await);
}
