// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Brain Agent CLI
//!
//! The `brain` binary registers document directories as brains and queries
//! them through the activation and synthesis pipeline. Everything runs in
//! process; registrations persist in the configuration file.
//!
//! ## Commands
//!
//! - `brain register|unregister|list` - Brain registry
//! - `brain query|ask|replicant` - Query a brain directly or through a facade
//! - `brain config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use brain_agent::commands::{self, BrainCommand, ConfigCommand};
use brain_core::domain::agent_config::{LoadedConfig, LoggingConfig, ENV_CONFIG_PATH};

/// Brain Agent - activate the relevant parts of a document collection
#[derive(Parser)]
#[command(name = "brain")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = ENV_CONFIG_PATH, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true, env = "BRAIN_AGENT_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Brain(BrainCommand),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        eprintln!("{}", "No command specified. Use --help for usage.".yellow());
        std::process::exit(1);
    };

    // Configuration is loaded once; its log lines are emitted after the
    // subscriber it configures is installed.
    let loaded = LoadedConfig::load(cli.config.clone());
    let mut logging = loaded
        .as_ref()
        .map(|config| config.effective.spec.logging())
        .unwrap_or_default();
    if let Some(level) = cli.log_level {
        logging.level = level;
    }
    init_logging(&logging)?;
    if let Ok(config) = &loaded {
        config.log_summary();
    }

    if let Err(e) = run(command, cli.config, loaded).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Commands, config_path: Option<PathBuf>, loaded: Result<LoadedConfig>) -> Result<()> {
    match command {
        Commands::Brain(command) => {
            let config = loaded.context("Failed to load configuration")?;
            commands::brain::handle_command(command, config).await
        }
        Commands::Config { command } => commands::config::handle_command(command, config_path, loaded).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
