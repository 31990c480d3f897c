//! Resource relationship graph
//!
//! Turns the objects and relations reported by a traversal into the
//! deduplicated node/edge graph exported to the resource viewer:
//! - `identity` - object ids and pod group keys
//! - `object_node` / `pod_group` - node renderers
//! - `handler` - the concurrent accumulator and snapshot producer
//! - `dedup` - canonical edge orientation and ordering
//! - `component` - the exported JSON surface

pub mod component;
pub mod dedup;
pub mod handler;
pub mod identity;
pub mod object_node;
pub mod pod_group;

pub use component::{
    AdjacencyList, Component, Edge, EdgeType, Link, Node, NodeStatus, Nodes, PodStatus,
    PodSummary, ResourceViewerComponent, Text,
};
pub use dedup::dedup_edges;
pub use handler::Handler;
pub use identity::{PodGroupKey, composite_id, identify};
pub use object_node::{NodeOutcome, ObjectNode};
pub use pod_group::PodGroupNode;

use crate::link::LinkError;

/// Graph construction errors
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("invalid object: {0}")]
    InvalidObject(String),

    #[error("unable to resolve path for {kind} {name}: {source}")]
    Link {
        kind: String,
        name: String,
        #[source]
        source: LinkError,
    },

    #[error("node id {0} is used by more than one node")]
    DuplicateNode(String),

    #[error("graph build cancelled")]
    Cancelled,
}
