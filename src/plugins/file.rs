//! File-backed status plugin
//!
//! Reads a YAML rule manifest:
//!
//! ```yaml
//! rules:
//!   - kind: Deployment
//!     apiVersion: apps/v1      # optional
//!     namespace: payments      # optional
//!     name: api                # optional
//!     status: warning          # optional
//!     details: ["Pinned to legacy node pool"]
//! ```
//!
//! Every matching rule contributes to the overlay in file order.

use async_trait::async_trait;
use kube::ResourceExt;
use kube::core::DynamicObject;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{PluginError, PluginManager, PluginResult, PluginStatus, StatusPlugin};
use crate::config::PluginConfig;
use crate::graph::{Component, NodeStatus};
use crate::models::{GroupKind, ObjectExt};

/// One matching rule
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRule {
    pub kind: String,

    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub status: Option<NodeStatus>,

    #[serde(default)]
    pub details: Vec<String>,
}

impl StatusRule {
    fn matches_type(&self, gk: &GroupKind) -> bool {
        self.kind == gk.kind
            && self
                .api_version
                .as_deref()
                .is_none_or(|api_version| {
                    GroupKind::from_api_version(api_version, &self.kind) == *gk
                })
    }

    fn matches(&self, object: &DynamicObject) -> bool {
        self.matches_type(&object.group_kind())
            && self
                .api_version
                .as_deref()
                .is_none_or(|api_version| api_version == object.object_api_version())
            && self
                .namespace
                .as_ref()
                .is_none_or(|namespace| object.namespace().as_ref() == Some(namespace))
            && self.name.as_ref().is_none_or(|name| &object.name_any() == name)
    }
}

#[derive(Debug, Deserialize)]
struct RuleManifest {
    #[serde(default)]
    rules: Vec<StatusRule>,
}

/// Status plugin driven by static rules
pub struct FileStatusPlugin {
    name: String,
    rules: Vec<StatusRule>,
}

impl FileStatusPlugin {
    pub fn new(name: impl Into<String>, rules: Vec<StatusRule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    /// Parse a rule manifest
    pub fn from_yaml(name: &str, content: &str) -> PluginResult<Self> {
        let manifest: RuleManifest = serde_yaml::from_str(content)
            .map_err(|e| PluginError::InvalidManifest(format!("{}: {}", name, e)))?;

        for (index, rule) in manifest.rules.iter().enumerate() {
            if rule.kind.trim().is_empty() {
                return Err(PluginError::InvalidManifest(format!(
                    "{}: rule {} has an empty kind",
                    name, index
                )));
            }
        }

        Ok(Self::new(name, manifest.rules))
    }

    /// Read and parse a rule manifest file
    pub async fn load(name: &str, path: &Path) -> PluginResult<Self> {
        tracing::debug!("Loading status plugin {} from {:?}", name, path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PluginError::LoadError(format!("{:?}: {}", path, e)))?;

        Self::from_yaml(name, &content)
    }

    pub fn rules(&self) -> &[StatusRule] {
        &self.rules
    }
}

#[async_trait]
impl StatusPlugin for FileStatusPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn handles(&self, gk: &GroupKind) -> bool {
        self.rules.iter().any(|rule| rule.matches_type(gk))
    }

    async fn object_status(&self, object: &DynamicObject) -> PluginResult<PluginStatus> {
        let mut overlay = PluginStatus::default();
        for rule in self.rules.iter().filter(|rule| rule.matches(object)) {
            overlay.merge(PluginStatus {
                status: rule.status,
                details: rule.details.iter().map(Component::text).collect(),
            });
        }
        Ok(overlay)
    }
}

/// Build a manager from configured plugin files, in configuration order
pub async fn load_plugins(configs: &[PluginConfig]) -> PluginResult<PluginManager> {
    let mut manager = PluginManager::new();
    for config in configs {
        let path = PathBuf::from(&config.path);
        let plugin = FileStatusPlugin::load(&config.name, &path).await?;
        tracing::info!(
            "Loaded status plugin {} with {} rule(s)",
            config.name,
            plugin.rules().len()
        );
        manager.register(Arc::new(plugin));
    }
    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::object_from_value;
    use serde_json::json;
    use std::io::Write;

    const RULES: &str = r#"
rules:
  - kind: Deployment
    namespace: payments
    status: warning
    details: ["Pinned to legacy node pool"]
  - kind: Deployment
    apiVersion: apps/v1
    name: api
    details: ["Owned by team-payments"]
  - kind: Ingress
    apiVersion: networking.k8s.io/v1
    status: error
"#;

    fn deployment(namespace: &str, name: &str) -> DynamicObject {
        object_from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": name, "namespace": namespace}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_matching_rules_merge_in_order() {
        let plugin = FileStatusPlugin::from_yaml("policy", RULES).unwrap();
        let overlay = plugin
            .object_status(&deployment("payments", "api"))
            .await
            .unwrap();

        assert_eq!(overlay.status, Some(NodeStatus::Warning));
        assert_eq!(
            overlay.details,
            vec![
                Component::text("Pinned to legacy node pool"),
                Component::text("Owned by team-payments")
            ]
        );
    }

    #[tokio::test]
    async fn test_non_matching_object_gets_empty_overlay() {
        let plugin = FileStatusPlugin::from_yaml("policy", RULES).unwrap();
        let overlay = plugin
            .object_status(&deployment("default", "web"))
            .await
            .unwrap();
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_handles_respects_group() {
        let plugin = FileStatusPlugin::from_yaml("policy", RULES).unwrap();
        assert!(plugin.handles(&GroupKind::new("apps", "Deployment")));
        assert!(plugin.handles(&GroupKind::new("networking.k8s.io", "Ingress")));
        assert!(!plugin.handles(&GroupKind::new("extensions", "Ingress")));
        assert!(!plugin.handles(&GroupKind::new("", "Pod")));
    }

    #[test]
    fn test_empty_kind_is_invalid() {
        let err = FileStatusPlugin::from_yaml("broken", "rules:\n  - kind: \"\"\n").err();
        assert!(matches!(err, Some(PluginError::InvalidManifest(_))));
    }

    #[tokio::test]
    async fn test_load_plugins_from_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RULES.as_bytes()).unwrap();

        let configs = vec![PluginConfig {
            name: "policy".to_string(),
            path: file.path().to_string_lossy().to_string(),
        }];
        let manager = load_plugins(&configs).await.unwrap();
        assert_eq!(manager.names(), vec!["policy"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_load_error() {
        let configs = vec![PluginConfig {
            name: "missing".to_string(),
            path: "/nonexistent/resview/rules.yaml".to_string(),
        }];
        let err = load_plugins(&configs).await.err();
        assert!(matches!(err, Some(PluginError::LoadError(_))));
    }
}
