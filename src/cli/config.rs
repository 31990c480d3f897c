//! Config command handlers

use anyhow::{Context, Result};
use clap::Subcommand;

use resview::config::{CONFIG_KEYS, ConfigLoader, get_config_value, paths, set_config_value};

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get configuration value
    Get {
        /// Configuration key (e.g., "groupPods", "cache.capacity")
        key: Option<String>,
    },
    /// Set configuration value
    Set {
        /// Configuration key (e.g., "groupPods", "cache.capacity")
        key: String,
        /// Configuration value
        value: String,
    },
    /// List all configuration
    List,
    /// Show configuration file path
    Path,
    /// Validate configuration
    Validate,
}

/// Handle configuration subcommands
pub async fn handle_config_command(cmd: ConfigSubcommand) -> Result<()> {
    match cmd {
        ConfigSubcommand::Get { key } => {
            let config = ConfigLoader::load().context("Failed to load configuration")?;

            if let Some(key) = key {
                let value = get_config_value(&config, &key)?;
                println!("{}", value.trim_end());
            } else {
                let yaml =
                    serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
                print!("{}", yaml);
            }
        }
        ConfigSubcommand::Set { key, value } => {
            let mut config = ConfigLoader::load().unwrap_or_else(|e| {
                tracing::warn!("Failed to load configuration, starting from defaults: {:#}", e);
                ConfigLoader::load_defaults()
            });

            set_config_value(&mut config, &key, &value)
                .with_context(|| format!("Failed to set {} = {}", key, value))?;
            config
                .validate()
                .with_context(|| format!("Invalid value for {}", key))?;

            ConfigLoader::save_root(&config).context("Failed to save configuration")?;
            println!("Configuration saved");
        }
        ConfigSubcommand::List => {
            let config = ConfigLoader::load().context("Failed to load configuration")?;
            for key in CONFIG_KEYS {
                let value = get_config_value(&config, key)?;
                println!("{}: {}", key, value.trim_end());
            }
        }
        ConfigSubcommand::Path => {
            println!("{}", paths::root_config_path().display());
        }
        ConfigSubcommand::Validate => match ConfigLoader::validate() {
            Ok(()) => println!("Configuration is valid"),
            Err(e) => {
                eprintln!("Configuration validation failed: {:#}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
