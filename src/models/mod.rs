//! Object model helpers
//!
//! The viewer works on `DynamicObject` so any kind, built-in or custom,
//! can flow through traversal and rendering. This module provides:
//! - `object.rs` - accessors and ownership predicates over dynamic objects
//! - `resource_kind.rs` - the well-known kinds with dedicated handling

pub mod object;
pub mod resource_kind;

pub use object::{ObjectExt, is_owned_by, object_from_value, typed};
pub use resource_kind::ResourceKind;

use std::fmt;

/// API group and kind of an object, without its version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Build from an apiVersion such as `apps/v1` (core group for bare `v1`)
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        Self::new(api_group(api_version), kind)
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// Extract the group portion of an apiVersion
pub fn api_group(api_version: &str) -> &str {
    api_version
        .split_once('/')
        .map(|(group, _)| group)
        .unwrap_or("")
}

/// Extract the version portion of an apiVersion
pub fn api_version_number(api_version: &str) -> &str {
    api_version
        .split_once('/')
        .map(|(_, version)| version)
        .unwrap_or(api_version)
}
