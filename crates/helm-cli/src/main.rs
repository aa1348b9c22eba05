//! Command-line tooling for Helm
//!
//! Runs operations against simulated participants and validates
//! configuration files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use helm_core::HelmConfig;
use std::path::PathBuf;

mod commands;

use commands::{
    check_config,
    rollout::{self, RolloutArgs},
};

#[derive(Parser)]
#[command(name = "helm")]
#[command(about = "Helm - distributed management operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll an operation out to simulated participants
    Rollout(RolloutArgs),

    /// Validate a configuration file
    CheckConfig {
        /// File to validate
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = HelmConfig::load(cli.config.as_deref())?;

    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.filter.clone()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Rollout(args) => {
            rollout::run(args, config).await?;
        }

        Commands::CheckConfig { path } => {
            check_config::run(&path)?;
        }
    }

    Ok(())
}
