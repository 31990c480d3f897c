//! resview - Kubernetes resource relationship viewer
//!
//! Walks the objects related to one Kubernetes object (owners, owned
//! workloads, selected pods, referenced configuration) and prints the
//! deduplicated resource viewer graph as JSON.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{ConfigSubcommand, GraphArgs};
use resview::config::ConfigLoader;

/// resview - Kubernetes resource relationship viewer
#[derive(Parser, Debug)]
#[command(name = "resview")]
#[command(about = "Builds the resource relationship graph of a Kubernetes object", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Build the resource viewer graph for one object
    Graph(GraphArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = cli::init_logging(args.debug)?;
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    match args.command {
        Command::Graph(graph) => {
            let config = ConfigLoader::load().unwrap_or_else(|e| {
                tracing::warn!("Failed to load configuration, using defaults: {:#}", e);
                ConfigLoader::load_defaults()
            });
            tracing::debug!(
                "Configuration loaded: groupPods={}, defaultNamespace={}",
                config.group_pods,
                config.default_namespace
            );
            cli::handle_graph_command(graph, &config).await
        }
        Command::Config { subcommand } => cli::handle_config_command(subcommand).await,
        Command::Version => {
            cli::display_version();
            Ok(())
        }
    }
}
