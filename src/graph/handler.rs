//! Graph handler
//!
//! Accumulates `process`/`add_edge` calls from concurrent traversal workers
//! and produces node, edge and component snapshots on demand. All state sits
//! behind one mutex; ingestion and edge snapshots are short synchronous
//! critical sections, while node rendering (status and link resolution)
//! copies the state out and runs without holding the lock.
//!
//! Pods that have an owner are folded into one group node per controller
//! when grouping is enabled. Edges are normalized at snapshot time:
//! - endpoints are mapped to their visible node (group id for grouped pods)
//! - edges touching skipped objects or unprocessed objects are dropped
//! - ownership edges point from owner to owned
//! - each unordered pair is kept once (see `dedup`)

use futures::future::join_all;
use kube::ResourceExt;
use kube::core::DynamicObject;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use super::identity::{PodGroupKey, identify};
use super::object_node::{NodeOutcome, ObjectNode, is_skipped};
use super::pod_group::PodGroupNode;
use super::{AdjacencyList, Edge, GraphError, Nodes, ResourceViewerComponent, dedup_edges};
use crate::cluster::ObjectHandler;
use crate::link::LinkResolver;
use crate::models::{ObjectExt, ResourceKind, is_owned_by};
use crate::status::StatusResolver;

/// Title of the exported component
pub const RESOURCE_VIEWER_TITLE: &str = "Resource Viewer";

#[derive(Debug, Default, Clone)]
struct HandlerState {
    /// Every object seen, processed or only referenced by an edge
    objects: BTreeMap<String, DynamicObject>,
    /// Ids passed to `process`
    processed: BTreeSet<String>,
    /// Recorded relations, source id to target ids
    edges: BTreeMap<String, BTreeSet<String>>,
}

/// Stateful accumulator for one graph request
pub struct Handler {
    object_node: ObjectNode,
    pod_group: PodGroupNode,
    group_pods: bool,
    state: Mutex<HandlerState>,
}

impl Handler {
    /// Create a handler with pod grouping enabled
    pub fn new(status: Arc<dyn StatusResolver>, links: Arc<dyn LinkResolver>) -> Self {
        Self {
            object_node: ObjectNode::new(status.clone(), links),
            pod_group: PodGroupNode::new(status),
            group_pods: true,
            state: Mutex::new(HandlerState::default()),
        }
    }

    pub fn with_pod_grouping(mut self, enabled: bool) -> Self {
        self.group_pods = enabled;
        self
    }

    fn lock(&self) -> MutexGuard<'_, HandlerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Group key of a pod that is folded into a group node
    pub fn group_key(&self, object: &DynamicObject) -> Option<PodGroupKey> {
        if !self.group_pods || !object.is_kind(ResourceKind::Pod) {
            return None;
        }
        PodGroupKey::for_pod(object)
    }

    /// Id of the node an object is displayed as, `None` when it is skipped
    fn visible_id(&self, object: &DynamicObject) -> Option<String> {
        if is_skipped(object) {
            return None;
        }
        match self.group_key(object) {
            Some(key) => Some(key.node_id()),
            None => Some(identify(object)),
        }
    }

    fn validate(object: &DynamicObject) -> Result<(), GraphError> {
        if object.is_empty_object() {
            return Err(GraphError::InvalidObject(
                "object has no type and no name".to_string(),
            ));
        }
        Ok(())
    }

    /// Register an object. Re-processing the same id replaces it.
    pub fn process(&self, object: &DynamicObject) -> Result<(), GraphError> {
        Self::validate(object)?;
        let id = identify(object);

        let mut state = self.lock();
        state.objects.insert(id.clone(), object.clone());
        state.processed.insert(id.clone());

        match self.group_key(object) {
            Some(key) => tracing::debug!("Processed pod {} into group {}", id, key),
            None => tracing::debug!("Processed {} {}", object.object_kind(), id),
        }
        Ok(())
    }

    /// Record a relation. Relations from a grouped pod are stored reversed.
    pub fn add_edge(
        &self,
        parent: &DynamicObject,
        child: &DynamicObject,
    ) -> Result<(), GraphError> {
        Self::validate(parent)?;
        Self::validate(child)?;

        let (parent, child) = if self.group_key(parent).is_some() {
            (child, parent)
        } else {
            (parent, child)
        };

        let parent_id = identify(parent);
        let child_id = identify(child);
        if parent_id == child_id {
            return Ok(());
        }

        let mut state = self.lock();
        state
            .objects
            .entry(parent_id.clone())
            .or_insert_with(|| parent.clone());
        state
            .objects
            .entry(child_id.clone())
            .or_insert_with(|| child.clone());
        if state
            .edges
            .entry(parent_id.clone())
            .or_default()
            .insert(child_id.clone())
        {
            tracing::debug!("Added edge {} -> {}", parent_id, child_id);
        }
        Ok(())
    }

    /// Deduplicated edges between visible nodes
    pub fn adjacency_list(&self) -> AdjacencyList {
        let state = self.lock();

        let visible: BTreeSet<String> = state
            .processed
            .iter()
            .filter_map(|id| state.objects.get(id))
            .filter_map(|object| self.visible_id(object))
            .collect();

        let mut raw = AdjacencyList::new();
        for (parent_id, children) in &state.edges {
            let Some(parent) = state.objects.get(parent_id) else {
                continue;
            };
            let Some(parent_node) = self.visible_id(parent) else {
                continue;
            };

            for child_id in children {
                let Some(child) = state.objects.get(child_id) else {
                    continue;
                };
                let Some(child_node) = self.visible_id(child) else {
                    continue;
                };
                if parent_node == child_node {
                    continue;
                }

                let (source, target, owned, owner) = if is_owned_by(parent, child) {
                    (child_node, parent_node.clone(), parent, child)
                } else {
                    (parent_node.clone(), child_node, child, parent)
                };

                if self.is_group_to_controller(owned, owner, &source, &target) {
                    continue;
                }
                if !visible.contains(&source) || !visible.contains(&target) {
                    continue;
                }

                let targets = raw.entry(source).or_default();
                let edge = Edge::explicit(target);
                if !targets.contains(&edge) {
                    targets.push(edge);
                }
            }
        }

        dedup_edges(&raw)
    }

    /// True when the edge would point from a pod group back at the
    /// controller owning its members.
    fn is_group_to_controller(
        &self,
        owned: &DynamicObject,
        owner: &DynamicObject,
        source: &str,
        target: &str,
    ) -> bool {
        let Some(key) = self.group_key(owned) else {
            return false;
        };
        source == key.node_id()
            && target == identify(owner)
            && owner.object_kind() == key.owner_kind
            && owner.name_any() == key.owner_name
    }

    /// Render every visible node. Skipped objects are omitted; the first
    /// rendering failure aborts the snapshot.
    pub async fn nodes(&self, cancel: &CancellationToken) -> Result<Nodes, GraphError> {
        let (singles, groups) = {
            let state = self.lock();
            let mut singles = Vec::new();
            let mut groups: BTreeMap<PodGroupKey, Vec<DynamicObject>> = BTreeMap::new();
            for id in &state.processed {
                let Some(object) = state.objects.get(id) else {
                    continue;
                };
                match self.group_key(object) {
                    Some(key) => groups.entry(key).or_default().push(object.clone()),
                    None => singles.push((id.clone(), object.clone())),
                }
            }
            (singles, groups)
        };

        if cancel.is_cancelled() {
            return Err(GraphError::Cancelled);
        }

        let render = async {
            let rendered = join_all(singles.iter().map(|(id, object)| async move {
                (id.clone(), self.object_node.create(object).await)
            }))
            .await;
            let grouped = join_all(groups.iter().map(|(key, members)| async move {
                let node = self.pod_group.create(&key.display_name(), members).await;
                (key.node_id(), node)
            }))
            .await;
            (rendered, grouped)
        };

        let (rendered, grouped) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GraphError::Cancelled),
            result = render => result,
        };

        let mut nodes = Nodes::new();
        for (id, outcome) in rendered {
            match outcome {
                NodeOutcome::Rendered(node) => {
                    nodes.insert(id, node);
                }
                NodeOutcome::Skipped => tracing::debug!("Skipped node {}", id),
                NodeOutcome::Failed(e) => return Err(e),
            }
        }
        for (id, node) in grouped {
            if nodes.insert(id.clone(), node).is_some() {
                return Err(GraphError::DuplicateNode(id));
            }
        }

        Ok(nodes)
    }

    /// Node id the UI should highlight for `selected`: a grouped pod's id
    /// resolves to its group, anything else is returned unchanged.
    pub fn selection(&self, selected: &str) -> String {
        let state = self.lock();
        state
            .objects
            .get(selected)
            .filter(|_| state.processed.contains(selected))
            .and_then(|object| self.group_key(object))
            .map(|key| key.node_id())
            .unwrap_or_else(|| selected.to_string())
    }

    /// Assemble the exported component
    pub async fn component(
        &self,
        selected: &str,
        cancel: &CancellationToken,
    ) -> Result<ResourceViewerComponent, GraphError> {
        let nodes = self.nodes(cancel).await?;

        let mut edges = self.adjacency_list();
        edges.retain(|source, targets| {
            targets.retain(|edge| nodes.contains_key(&edge.node));
            nodes.contains_key(source) && !targets.is_empty()
        });

        let selected = self.selection(selected);
        tracing::debug!(
            "Built component with {} nodes, {} edge sources, selected {}",
            nodes.len(),
            edges.len(),
            selected
        );

        Ok(ResourceViewerComponent::new(
            RESOURCE_VIEWER_TITLE,
            nodes,
            edges,
            selected,
        ))
    }

    /// Drop all accumulated state
    pub fn reset(&self) {
        *self.lock() = HandlerState::default();
    }
}

impl ObjectHandler for Handler {
    fn process(&self, object: &DynamicObject) -> Result<(), GraphError> {
        Handler::process(self, object)
    }

    fn add_edge(&self, parent: &DynamicObject, child: &DynamicObject) -> Result<(), GraphError> {
        Handler::add_edge(self, parent, child)
    }
}
