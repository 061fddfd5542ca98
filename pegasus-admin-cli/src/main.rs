use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use pegasus_admin::{AdminConfig, ClusterHandle, RpcClusterHandle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "pegasus-admin")]
#[command(about = "Pegasus admin CLI - cluster control plane tools")]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, env = "PEGASUS_ADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// Meta server addresses, overriding the config file
    #[arg(long, global = true, env = "PEGASUS_META_SERVERS", value_delimiter = ',')]
    meta_servers: Option<Vec<String>>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read or change the meta function level
    MetaLevel {
        #[command(subcommand)]
        action: MetaLevelAction,
    },

    /// Summarize perf counters across all data nodes
    NodesStat {
        /// Include the per-node samples
        #[arg(short, long)]
        detail: bool,
    },
}

#[derive(Subcommand, Debug)]
enum MetaLevelAction {
    /// Print the current level
    Get,
    /// Switch to a new level (stopped, blind, freezed, steady, lively)
    Set { level: String },
}

fn log_filter(verbose: u8) -> tracing_subscriber::EnvFilter {
    if let Ok(filter) = std::env::var("RUST_LOG") {
        return tracing_subscriber::EnvFilter::new(filter);
    }
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::EnvFilter::new(level)
}

fn load_config(cli: &Cli) -> Result<AdminConfig> {
    let mut config = match &cli.config {
        Some(path) => AdminConfig::load_from(path)?,
        None => AdminConfig::load()?,
    };

    if let Some(servers) = &cli.meta_servers {
        config.meta_servers = servers
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        config.validate()?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output only.
    tracing_subscriber::registry()
        .with(log_filter(cli.verbose))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&cli)?;
    tracing::debug!("Meta servers: {:?}", config.meta_servers);

    let handle: Arc<dyn ClusterHandle> = Arc::new(
        RpcClusterHandle::connect(&config).context("Failed to set up cluster client")?,
    );

    match cli.command {
        Commands::MetaLevel { action } => match action {
            MetaLevelAction::Get => commands::run_meta_level_get(handle, &config).await?,
            MetaLevelAction::Set { level } => {
                commands::run_meta_level_set(handle, &config, &level).await?
            }
        },
        Commands::NodesStat { detail } => {
            commands::run_nodes_stat(handle, &config, detail).await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta_level_set() {
        let cli = Cli::try_parse_from(["pegasus-admin", "meta-level", "set", "lively"]).unwrap();
        match cli.command {
            Commands::MetaLevel {
                action: MetaLevelAction::Set { level },
            } => assert_eq!(level, "lively"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_nodes_stat_detail_and_globals() {
        let cli = Cli::try_parse_from([
            "pegasus-admin",
            "nodes-stat",
            "-d",
            "--meta-servers",
            "10.0.0.1:34601,10.0.0.2:34601",
            "-vv",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::NodesStat { detail: true }));
        assert_eq!(
            cli.meta_servers.unwrap(),
            vec!["10.0.0.1:34601", "10.0.0.2:34601"]
        );
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_set_requires_level() {
        assert!(Cli::try_parse_from(["pegasus-admin", "meta-level", "set"]).is_err());
    }
}
