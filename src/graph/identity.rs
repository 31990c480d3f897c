//! Object identity and pod group keys

use kube::ResourceExt;
use kube::core::DynamicObject;
use std::fmt;

use crate::models::ObjectExt;

/// Identifier of an object within one traversal.
///
/// The UID when present, otherwise `apiVersion-kind-name`.
pub fn identify(object: &DynamicObject) -> String {
    match object.uid() {
        Some(uid) if !uid.is_empty() => uid,
        _ => composite_id(
            object.object_api_version(),
            object.object_kind(),
            &object.name_any(),
        ),
    }
}

/// Deterministic fallback identifier
pub fn composite_id(api_version: &str, kind: &str, name: &str) -> String {
    format!("{}-{}-{}", api_version, kind, name)
}

/// Key of the aggregate node that stands in for all pods of one controller
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodGroupKey {
    pub namespace: String,
    pub owner_api_version: String,
    pub owner_kind: String,
    pub owner_name: String,
}

impl PodGroupKey {
    /// Derive the group key from a pod's controlling owner reference.
    ///
    /// Prefers the reference marked `controller: true`, falling back to the
    /// first one. Pods without owners have no group.
    pub fn for_pod(pod: &DynamicObject) -> Option<Self> {
        let references = pod.owner_references();
        let owner = references
            .iter()
            .find(|r| r.controller.unwrap_or(false))
            .or_else(|| references.first())?;

        Some(Self {
            namespace: pod.namespace().unwrap_or_default(),
            owner_api_version: owner.api_version.clone(),
            owner_kind: owner.kind.clone(),
            owner_name: owner.name.clone(),
        })
    }

    /// Node id of the group node, the stable encoding of the whole key
    pub fn node_id(&self) -> String {
        self.to_string()
    }

    /// Display name of the group node
    pub fn display_name(&self) -> String {
        format!("{} pods", self.owner_name)
    }
}

/// Stable encoding: `pods` followed by length-prefixed fields, so no two
/// distinct keys can share an encoding.
impl fmt::Display for PodGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pods")?;
        for field in [
            &self.namespace,
            &self.owner_api_version,
            &self.owner_kind,
            &self.owner_name,
        ] {
            write!(f, ":{}:{}", field.len(), field)?;
        }
        Ok(())
    }
}
