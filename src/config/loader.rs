//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{paths, schema::Config};
use anyhow::{Context, Result};
use std::path::Path;

/// Environment variables overriding individual keys
pub const ENV_GROUP_PODS: &str = "RESVIEW_GROUP_PODS";
pub const ENV_DEFAULT_NAMESPACE: &str = "RESVIEW_DEFAULT_NAMESPACE";
pub const ENV_CACHE_CAPACITY: &str = "RESVIEW_CACHE_CAPACITY";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Root config file
    /// 3. Built-in defaults
    pub fn load() -> Result<Config> {
        Self::load_from(&paths::root_config_path())
    }

    /// Load with `path` as the root config file
    pub fn load_from(path: &Path) -> Result<Config> {
        let mut config = Self::load_defaults();

        if path.exists() {
            let file_config = Self::load_file(path)?;
            config = Self::merge_config(config, file_config);
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
        }

        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the root config file and the merged result
    pub fn validate() -> Result<()> {
        let root_path = paths::root_config_path();
        if root_path.exists() {
            Self::load_file(&root_path)?
                .validate()
                .with_context(|| format!("Invalid config file: {}", root_path.display()))?;
        }

        Self::load()
            .context("Failed to load merged configuration")?
            .validate()
            .context("Invalid merged configuration")
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        Config::default()
    }

    /// Merge two configurations, with `other` taking precedence.
    ///
    /// Missing keys in a file are already filled with defaults by serde, so
    /// a file layer replaces the base; plugin lists are concatenated.
    fn merge_config(base: Config, other: Config) -> Config {
        let mut plugins = base.plugins;
        for plugin in other.plugins {
            plugins.retain(|existing| existing.name != plugin.name);
            plugins.push(plugin);
        }

        Config { plugins, ..other }
    }

    /// Apply environment variable overrides. Unparseable values are ignored.
    fn apply_env_overrides(
        mut config: Config,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Config {
        if let Some(group_pods) = lookup(ENV_GROUP_PODS) {
            match group_pods.parse::<bool>() {
                Ok(val) => config.group_pods = val,
                Err(_) => tracing::warn!("Ignoring {}={}", ENV_GROUP_PODS, group_pods),
            }
        }

        if let Some(namespace) = lookup(ENV_DEFAULT_NAMESPACE).filter(|ns| !ns.is_empty()) {
            config.default_namespace = namespace;
        }

        if let Some(capacity) = lookup(ENV_CACHE_CAPACITY) {
            match capacity.parse::<usize>() {
                Ok(val) => config.cache.capacity = val,
                Err(_) => tracing::warn!("Ignoring {}={}", ENV_CACHE_CAPACITY, capacity),
            }
        }

        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<()> {
        Self::save(config, &paths::root_config_path())
    }
}
