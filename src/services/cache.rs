//! Component cache
//!
//! Bounded least-recently-used cache of built graphs plus the async builder
//! used to fill it. Callers get a placeholder graph immediately and the real
//! one once the background build lands in the cache.

use anyhow::Result;
use kube::ResourceExt;
use kube::core::DynamicObject;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::resource_viewer::ResourceViewer;
use crate::config::Config;
use crate::graph::{Component, Node, NodeStatus, Nodes, ResourceViewerComponent, identify};
use crate::graph::handler::RESOURCE_VIEWER_TITLE;
use crate::models::ObjectExt;

/// Cached component entry
#[derive(Debug, Clone)]
struct CacheEntry {
    component: ResourceViewerComponent,
    /// Logical clock value of the last access
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    clock: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Bounded LRU cache of resource viewer components keyed by string
pub struct ComponentCache {
    capacity: NonZeroUsize,
    state: Mutex<CacheState>,
}

impl ComponentCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Cache bounded by `cache.capacity`. A zero capacity holds one entry.
    pub fn from_config(config: &Config) -> Self {
        let capacity = NonZeroUsize::new(config.cache.capacity).unwrap_or_else(|| {
            tracing::warn!("cache.capacity is 0, caching a single graph");
            NonZeroUsize::MIN
        });
        Self::new(capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Get a component, marking it most recently used
    pub async fn get(&self, key: &str) -> Option<ResourceViewerComponent> {
        let mut state = self.state.lock().await;
        let now = state.tick();
        state.entries.get_mut(key).map(|entry| {
            entry.last_used = now;
            entry.component.clone()
        })
    }

    /// Insert a component, evicting the least recently used entry when full
    pub async fn insert(&self, key: impl Into<String>, component: ResourceViewerComponent) {
        let key = key.into();
        let mut state = self.state.lock().await;
        let now = state.tick();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity.get() {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Evicting {} from component cache", oldest);
                state.entries.remove(&oldest);
            }
        }

        state.entries.insert(
            key,
            CacheEntry {
                component,
                last_used: now,
            },
        );
    }

    pub async fn remove(&self, key: &str) -> Option<ResourceViewerComponent> {
        let mut state = self.state.lock().await;
        state.entries.remove(key).map(|entry| entry.component)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.state.lock().await.entries.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Cache key of the graph built around `object`
pub fn cache_key(object: &DynamicObject) -> String {
    format!("resourceviewer/{}", identify(object))
}

/// Start building the graph for `object` in the background.
///
/// Returns the cache key right away; the finished component or the error
/// arrives on the receiver.
pub fn build_async(
    viewer: Arc<ResourceViewer>,
    object: DynamicObject,
    cancel: CancellationToken,
) -> (String, oneshot::Receiver<Result<ResourceViewerComponent>>) {
    let key = cache_key(&object);
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let result = viewer.visit(&object, &cancel).await;
        if tx.send(result).is_err() {
            tracing::debug!("Resource viewer result for {} dropped", object.name_any());
        }
    });

    (key, rx)
}

/// Graph with a single "Loading" node for `object`
pub fn loading_component(object: &DynamicObject) -> ResourceViewerComponent {
    let id = identify(object);
    let mut nodes = Nodes::new();
    nodes.insert(
        id.clone(),
        Node {
            name: object.name_any(),
            api_version: object.object_api_version().to_string(),
            kind: object.object_kind().to_string(),
            status: NodeStatus::Unknown,
            details: vec![Component::text("Loading")],
            path: None,
        },
    );
    ResourceViewerComponent::new(RESOURCE_VIEWER_TITLE, nodes, Default::default(), id)
}

/// Resource viewer backed by a component cache
pub struct CachedResourceViewer {
    viewer: Arc<ResourceViewer>,
    cache: Arc<ComponentCache>,
    pending: Arc<Mutex<HashSet<String>>>,
    cancel: CancellationToken,
}

impl CachedResourceViewer {
    pub fn new(viewer: Arc<ResourceViewer>, cache: Arc<ComponentCache>) -> Self {
        Self {
            viewer,
            cache,
            pending: Arc::new(Mutex::new(HashSet::new())),
            cancel: CancellationToken::new(),
        }
    }

    /// Cached viewer whose cache is sized from `config`
    pub fn from_config(viewer: Arc<ResourceViewer>, config: &Config) -> Self {
        Self::new(viewer, Arc::new(ComponentCache::from_config(config)))
    }

    pub fn cache(&self) -> &Arc<ComponentCache> {
        &self.cache
    }

    /// The cached graph for `object`, or a placeholder while it is built
    pub async fn component(&self, object: &DynamicObject) -> ResourceViewerComponent {
        if let Some(component) = self.cache.get(&cache_key(object)).await {
            return component;
        }
        self.refresh(object).await;
        loading_component(object)
    }

    /// Start a background build unless one is already running for the
    /// object. The returned handle completes once the cache is updated.
    pub async fn refresh(&self, object: &DynamicObject) -> Option<JoinHandle<()>> {
        let key = cache_key(object);
        if !self.pending.lock().await.insert(key.clone()) {
            return None;
        }

        let (key, rx) = build_async(self.viewer.clone(), object.clone(), self.cancel.child_token());
        let cache = self.cache.clone();
        let pending = self.pending.clone();

        Some(tokio::spawn(async move {
            match rx.await {
                Ok(Ok(component)) => cache.insert(key.clone(), component).await,
                Ok(Err(e)) => tracing::warn!("Failed to build {}: {:#}", key, e),
                Err(_) => tracing::warn!("Build of {} ended without a result", key),
            }
            pending.lock().await.remove(&key);
        }))
    }

    /// Cancel all in-flight builds
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AdjacencyList;
    use crate::models::object_from_value;
    use serde_json::json;

    fn component(selected: &str) -> ResourceViewerComponent {
        ResourceViewerComponent::new(
            RESOURCE_VIEWER_TITLE,
            Nodes::new(),
            AdjacencyList::new(),
            selected.to_string(),
        )
    }

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_least_recently_used_is_evicted() {
        let cache = ComponentCache::new(capacity(2));
        cache.insert("a", component("a")).await;
        cache.insert("b", component("b")).await;

        // touch a so b becomes the oldest
        assert!(cache.get("a").await.is_some());
        cache.insert("c", component("c")).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.contains("a").await);
        assert!(!cache.contains("b").await);
        assert!(cache.contains("c").await);
    }

    #[tokio::test]
    async fn test_reinsert_does_not_evict() {
        let cache = ComponentCache::new(capacity(1));
        cache.insert("a", component("a")).await;
        cache.insert("a", component("a2")).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("a").await.unwrap().selected, "a2");
    }

    #[tokio::test]
    async fn test_capacity_comes_from_config() {
        let mut config = Config::default();
        config.cache.capacity = 2;
        let cache = ComponentCache::from_config(&config);
        assert_eq!(cache.capacity(), 2);

        for key in ["a", "b", "c"] {
            cache.insert(key, component(key)).await;
        }
        assert_eq!(cache.len().await, 2);
        assert!(!cache.contains("a").await);
    }

    #[test]
    fn test_zero_capacity_config_holds_one_entry() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert_eq!(ComponentCache::from_config(&config).capacity(), 1);
    }

    #[test]
    fn test_loading_component_selects_placeholder() {
        let object = object_from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "default", "uid": "d-1"}
        }))
        .unwrap();

        let loading = loading_component(&object);
        assert_eq!(cache_key(&object), "resourceviewer/d-1");
        assert_eq!(loading.selected, "d-1");
        let node = loading.selected_node().unwrap();
        assert_eq!(node.details, vec![Component::text("Loading")]);
        assert_eq!(node.status, NodeStatus::Unknown);
    }
}
