//! Configuration system for resview
//!
//! Layers built-in defaults, the root YAML file and environment overrides,
//! and exposes dot-notation access for the `config` subcommand.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{CacheConfig, Config, LinksConfig, PluginConfig};

use anyhow::Context;

/// Keys understood by `get_config_value` and `set_config_value`
pub const CONFIG_KEYS: &[&str] = &[
    "groupPods",
    "defaultNamespace",
    "cache.capacity",
    "links.prefix",
    "links.clusterPrefix",
    "plugins",
];

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    match key {
        "groupPods" => Ok(config.group_pods.to_string()),
        "defaultNamespace" => Ok(config.default_namespace.clone()),
        "cache.capacity" => Ok(config.cache.capacity.to_string()),
        "links.prefix" => Ok(config.links.prefix.clone()),
        "links.clusterPrefix" => Ok(config.links.cluster_prefix.clone()),
        "plugins" => serde_yaml::to_string(&config.plugins)
            .map_err(|e| anyhow::anyhow!("Failed to serialize plugins: {}", e)),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> anyhow::Result<()> {
    match key {
        "groupPods" => {
            config.group_pods = value
                .parse()
                .context("groupPods must be 'true' or 'false'")?;
        }
        "defaultNamespace" => {
            config.default_namespace = value.to_string();
        }
        "cache.capacity" => {
            let capacity: usize = value
                .parse()
                .context("cache.capacity must be a number")?;
            if capacity == 0 {
                anyhow::bail!("cache.capacity must be greater than 0");
            }
            config.cache.capacity = capacity;
        }
        "links.prefix" => {
            config.links.prefix = value.to_string();
        }
        "links.clusterPrefix" => {
            config.links.cluster_prefix = value.to_string();
        }
        "plugins" => {
            config.plugins = serde_yaml::from_str(value).context(
                "plugins must be a YAML list (e.g. [{name: policy, path: /etc/policy.yaml}])",
            )?;
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}
