//! Single-object node renderer

use kube::ResourceExt;
use kube::core::DynamicObject;
use std::sync::Arc;

use super::{GraphError, Node};
use crate::link::LinkResolver;
use crate::models::{ObjectExt, ResourceKind};
use crate::status::{ObjectStatus, StatusResolver};

/// apiVersion every ReplicaSet is displayed with
const REPLICA_SET_DISPLAY_API_VERSION: &str = "extensions/v1beta1";

/// Result of rendering one object
#[derive(Debug)]
pub enum NodeOutcome {
    Rendered(Node),
    /// The object is intentionally hidden from the graph
    Skipped,
    Failed(GraphError),
}

impl NodeOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, NodeOutcome::Skipped)
    }

    pub fn into_result(self) -> Result<Option<Node>, GraphError> {
        match self {
            NodeOutcome::Rendered(node) => Ok(Some(node)),
            NodeOutcome::Skipped => Ok(None),
            NodeOutcome::Failed(err) => Err(err),
        }
    }
}

/// True for objects that never appear in the graph: ReplicaSets whose
/// desired replica count is missing or below one.
pub fn is_skipped(object: &DynamicObject) -> bool {
    if !object.is_kind(ResourceKind::ReplicaSet) {
        return false;
    }
    let replicas = object
        .data
        .get("spec")
        .and_then(|spec| spec.get("replicas"))
        .and_then(|replicas| replicas.as_i64());
    replicas.is_none_or(|replicas| replicas < 1)
}

/// apiVersion shown on the node
pub fn display_api_version(object: &DynamicObject) -> String {
    if object.is_kind(ResourceKind::ReplicaSet) {
        REPLICA_SET_DISPLAY_API_VERSION.to_string()
    } else {
        object.object_api_version().to_string()
    }
}

/// Renders concrete objects into nodes
#[derive(Clone)]
pub struct ObjectNode {
    status: Arc<dyn StatusResolver>,
    links: Arc<dyn LinkResolver>,
}

impl ObjectNode {
    pub fn new(status: Arc<dyn StatusResolver>, links: Arc<dyn LinkResolver>) -> Self {
        Self { status, links }
    }

    pub async fn create(&self, object: &DynamicObject) -> NodeOutcome {
        if is_skipped(object) {
            return NodeOutcome::Skipped;
        }

        let name = object.name_any();
        let kind = object.object_kind().to_string();

        let status = match self.status.status(object).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Unable to resolve status for {} {}: {}", kind, name, e);
                ObjectStatus::default()
            }
        };

        let path = match self.links.resolve_path(object, &name, &[]) {
            Ok(path) => path,
            Err(source) => return NodeOutcome::Failed(GraphError::Link { kind, name, source }),
        };

        NodeOutcome::Rendered(Node {
            name,
            api_version: display_api_version(object),
            kind,
            status: status.node_status,
            details: status.details,
            path: Some(path),
        })
    }
}
