//! Accessors over dynamic Kubernetes objects

use kube::ResourceExt;
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;

use super::{GroupKind, ResourceKind, api_group};

/// Type and naming accessors for objects whose type lives in `TypeMeta`
pub trait ObjectExt {
    /// apiVersion, empty when the object carries no type information
    fn object_api_version(&self) -> &str;

    /// kind, empty when the object carries no type information
    fn object_kind(&self) -> &str;

    /// API group derived from the apiVersion (empty for the core group)
    fn object_group(&self) -> &str {
        api_group(self.object_api_version())
    }

    fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.object_group(), self.object_kind())
    }

    /// True when the object is the given well-known kind in one of its groups
    fn is_kind(&self, kind: ResourceKind) -> bool {
        self.object_kind() == kind.as_str() && kind.groups().contains(&self.object_group())
    }

    /// True when the object has neither type information nor a name
    fn is_empty_object(&self) -> bool;
}

impl ObjectExt for DynamicObject {
    fn object_api_version(&self) -> &str {
        self.types
            .as_ref()
            .map(|t| t.api_version.as_str())
            .unwrap_or("")
    }

    fn object_kind(&self) -> &str {
        self.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("")
    }

    fn is_empty_object(&self) -> bool {
        self.types.is_none() && self.metadata.name.is_none() && self.metadata.uid.is_none()
    }
}

/// Check whether `owner` appears in the owner references of `object`.
///
/// Matches by UID when both sides have one, otherwise by apiVersion/kind/name.
pub fn is_owned_by(object: &DynamicObject, owner: &DynamicObject) -> bool {
    let owner_uid = owner.uid().filter(|uid| !uid.is_empty());
    let owner_name = owner.name_any();

    object.owner_references().iter().any(|reference| {
        match owner_uid.as_deref() {
            Some(uid) if !reference.uid.is_empty() => reference.uid == uid,
            _ => {
                reference.kind == owner.object_kind()
                    && reference.name == owner_name
                    && reference.api_version == owner.object_api_version()
            }
        }
    })
}

/// Deserialize a JSON value (e.g. a parsed manifest) into a dynamic object
pub fn object_from_value(value: serde_json::Value) -> Result<DynamicObject, serde_json::Error> {
    serde_json::from_value(value)
}

/// Convert a dynamic object into a typed Kubernetes object
pub fn typed<K: DeserializeOwned>(object: &DynamicObject) -> Result<K, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(object)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: serde_json::Value) -> DynamicObject {
        object_from_value(value).unwrap()
    }

    #[test]
    fn test_type_accessors() {
        let rs = object(json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": {"name": "web-1", "namespace": "default", "uid": "rs-1"}
        }));

        assert_eq!(rs.object_api_version(), "apps/v1");
        assert_eq!(rs.object_kind(), "ReplicaSet");
        assert_eq!(rs.object_group(), "apps");
        assert!(rs.is_kind(ResourceKind::ReplicaSet));
        assert!(!rs.is_kind(ResourceKind::Deployment));
        assert!(!rs.is_empty_object());
    }

    #[test]
    fn test_is_owned_by_uid() {
        let deployment = object(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "default", "uid": "d-1"}
        }));
        let rs = object(json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": {
                "name": "web-1",
                "namespace": "default",
                "uid": "rs-1",
                "ownerReferences": [
                    {"apiVersion": "apps/v1", "kind": "Deployment", "name": "web", "uid": "d-1", "controller": true}
                ]
            }
        }));

        assert!(is_owned_by(&rs, &deployment));
        assert!(!is_owned_by(&deployment, &rs));
    }

    #[test]
    fn test_is_owned_by_falls_back_to_name() {
        let deployment = object(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "default"}
        }));
        let rs = object(json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": {
                "name": "web-1",
                "ownerReferences": [
                    {"apiVersion": "apps/v1", "kind": "Deployment", "name": "web", "uid": "d-1"}
                ]
            }
        }));

        assert!(is_owned_by(&rs, &deployment));
    }
}
