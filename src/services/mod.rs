//! Service layer
//!
//! Orchestrates traversal and graph building for callers (the CLI, or a
//! content pipeline that wants cached graphs delivered asynchronously).

pub mod cache;
pub mod resource_viewer;

pub use cache::{CachedResourceViewer, ComponentCache, build_async, cache_key, loading_component};
pub use resource_viewer::ResourceViewer;
