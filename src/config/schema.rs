//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Fold pods owned by one controller into a single node
    #[serde(default = "default_true")]
    pub group_pods: bool,

    /// Namespace used when none is given on the command line
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Component cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Dashboard link configuration
    #[serde(default)]
    pub links: LinksConfig,

    /// File-backed status plugins, applied in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginConfig>,
}

/// Component cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Maximum number of cached graphs
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

/// Dashboard link configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinksConfig {
    /// Prefix for namespaced object paths
    #[serde(default = "default_link_prefix")]
    pub prefix: String,

    /// Prefix for cluster-scoped object paths
    #[serde(default = "default_cluster_link_prefix")]
    pub cluster_prefix: String,
}

/// A status plugin rule file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    pub name: String,
    pub path: String,
}

impl Config {
    /// Check values serde cannot reject on its own
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache.capacity == 0 {
            anyhow::bail!("cache.capacity must be greater than 0");
        }
        if self.default_namespace.trim().is_empty() {
            anyhow::bail!("defaultNamespace must not be empty");
        }
        for (key, prefix) in [
            ("links.prefix", &self.links.prefix),
            ("links.clusterPrefix", &self.links.cluster_prefix),
        ] {
            if !prefix.starts_with('/') {
                anyhow::bail!("{} must start with '/', got '{}'", key, prefix);
            }
        }

        let mut names = HashSet::new();
        for plugin in &self.plugins {
            if plugin.name.trim().is_empty() || plugin.path.trim().is_empty() {
                anyhow::bail!("plugins entries require a name and a path");
            }
            if !names.insert(plugin.name.as_str()) {
                anyhow::bail!("plugin '{}' is configured more than once", plugin.name);
            }
        }
        Ok(())
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_cache_capacity() -> usize {
    64
}

fn default_link_prefix() -> String {
    "/overview".to_string()
}

fn default_cluster_link_prefix() -> String {
    "/cluster-overview".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            group_pods: default_true(),
            default_namespace: default_namespace(),
            cache: CacheConfig::default(),
            links: LinksConfig::default(),
            plugins: Vec::new(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            prefix: default_link_prefix(),
            cluster_prefix: default_cluster_link_prefix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_yaml::from_str("groupPods: false\ncache: {}\n").unwrap();
        assert!(!config.group_pods);
        assert_eq!(config.cache.capacity, 64);
        assert_eq!(config.links.prefix, "/overview");
        assert_eq!(config.default_namespace, "default");
    }

    #[test]
    fn test_plugins_round_trip_camel_case() {
        let yaml = "links:\n  clusterPrefix: /cluster\nplugins:\n  - name: policy\n    path: /etc/resview/policy.yaml\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.links.cluster_prefix, "/cluster");
        assert_eq!(config.plugins[0].name, "policy");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_is_invalid() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_plugin_is_invalid() {
        let plugin = PluginConfig {
            name: "policy".to_string(),
            path: "a.yaml".to_string(),
        };
        let config = Config {
            plugins: vec![plugin.clone(), plugin],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
