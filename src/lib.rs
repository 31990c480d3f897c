//! resview library
//!
//! Builds the resource relationship graph shown by a Kubernetes dashboard's
//! resource viewer. It can be used both as a binary and as a library for
//! testing.

pub mod cluster;
pub mod config;
pub mod graph;
pub mod link;
pub mod models;
pub mod plugins;
pub mod services;
pub mod status;

// Re-export commonly used types for convenience
pub use cluster::{MemoryStore, ObjectHandler, ObjectStore, OwnerVisitor};
pub use graph::{
    GraphError, Handler, NodeStatus, PodGroupKey, ResourceViewerComponent, dedup_edges, identify,
};
pub use link::{LinkResolver, ObjectPathResolver};
pub use services::{CachedResourceViewer, ComponentCache, ResourceViewer, build_async};
pub use status::{ObjectStatus, Resolver, StatusResolver};
