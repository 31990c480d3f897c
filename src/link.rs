//! Navigable paths for graph nodes

use kube::ResourceExt;
use kube::core::DynamicObject;
use url::form_urlencoded;

use crate::graph::Component;
use crate::models::{ObjectExt, ResourceKind, api_version_number};

/// Link resolution errors
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("unable to build a path for an object without a kind")]
    MissingKind,

    #[error("unable to build a path for {kind} without a name")]
    MissingName { kind: String },
}

/// Capability that turns an object into a dashboard link
#[cfg_attr(test, mockall::automock)]
pub trait LinkResolver: Send + Sync {
    fn resolve_path(
        &self,
        object: &DynamicObject,
        display_name: &str,
        query: &[(String, String)],
    ) -> Result<Component, LinkError>;
}

/// Default dashboard path layout
///
/// Namespaced objects live under `<prefix>/namespace/<ns>/<section>/<name>`,
/// cluster-scoped ones under `<cluster_prefix>/<section>/<name>`. Kinds
/// without a dedicated section are addressed as
/// `custom-resources/<Kind.group>/<version>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPathResolver {
    prefix: String,
    cluster_prefix: String,
}

impl Default for ObjectPathResolver {
    fn default() -> Self {
        Self::new("/overview", "/cluster-overview")
    }
}

impl ObjectPathResolver {
    pub fn new(prefix: impl Into<String>, cluster_prefix: impl Into<String>) -> Self {
        Self {
            prefix: trim_trailing_slash(prefix.into()),
            cluster_prefix: trim_trailing_slash(cluster_prefix.into()),
        }
    }

    /// Path for an object, without query parameters
    pub fn object_path(&self, object: &DynamicObject) -> Result<String, LinkError> {
        let kind = object.object_kind();
        if kind.is_empty() {
            return Err(LinkError::MissingKind);
        }
        let name = object
            .metadata
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| LinkError::MissingName {
                kind: kind.to_string(),
            })?;

        let section = match ResourceKind::from_group_kind(&object.group_kind()) {
            Some(known) => known.section().to_string(),
            None => {
                let version = api_version_number(object.object_api_version());
                format!("custom-resources/{}/{}", object.group_kind(), version)
            }
        };

        let path = match object.namespace().filter(|ns| !ns.is_empty()) {
            Some(namespace) => format!(
                "{}/namespace/{}/{}/{}",
                self.prefix, namespace, section, name
            ),
            None => format!("{}/{}/{}", self.cluster_prefix, section, name),
        };
        Ok(path)
    }
}

impl LinkResolver for ObjectPathResolver {
    fn resolve_path(
        &self,
        object: &DynamicObject,
        display_name: &str,
        query: &[(String, String)],
    ) -> Result<Component, LinkError> {
        let mut path = self.object_path(object)?;
        if !query.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            path.push('?');
            path.push_str(&encoded);
        }

        tracing::debug!("Resolved {} {} to {}", object.object_kind(), object.name_any(), path);
        Ok(Component::link(display_name, path))
    }
}

fn trim_trailing_slash(mut prefix: String) -> String {
    while prefix.ends_with('/') {
        prefix.pop();
    }
    prefix
}
