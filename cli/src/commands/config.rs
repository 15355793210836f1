// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use brain_core::domain::agent_config::{LoadedConfig, ENV_CONFIG_PATH};
use brain_core::infrastructure::llm::ProviderRegistry;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Also health-check every enabled LLM provider
        #[arg(long)]
        check_providers: bool,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./brain-agent.yaml)
        #[arg(short, long, default_value = "./brain-agent.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
    loaded: Result<LoadedConfig>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => {
            let config = loaded.context("Failed to load configuration")?;
            show(&config, config_override.as_ref(), paths, yaml)
        }
        ConfigCommand::Validate { file, check_providers } => {
            let config = match file {
                Some(path) => {
                    let config = LoadedConfig::load(Some(path));
                    if let Ok(config) = &config {
                        config.log_summary();
                    }
                    config
                }
                None => loaded,
            }
            .context("Failed to load configuration")?;
            validate(&config, check_providers).await
        }
        ConfigCommand::Generate {
            output,
            examples,
            force,
        } => generate(output, examples, force),
    }
}

fn show(loaded: &LoadedConfig, config_override: Option<&PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            ENV_CONFIG_PATH,
            std::env::var(ENV_CONFIG_PATH)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./brain-agent.yaml");
        println!("  4. ~/.brain_agent/config.yaml");
        println!("  5. /etc/brain-agent/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", serde_yaml::to_string(&loaded.effective)?);
        return Ok(());
    }

    let spec = &loaded.effective.spec;
    println!("{}", "Current configuration:".bold());
    match &loaded.path {
        Some(path) => println!("  Source: {}", path.display()),
        None => println!("  Source: {}", "(built-in defaults)".dimmed()),
    }
    for entry in &loaded.overrides {
        println!("  {}", entry.to_string().dimmed());
    }
    if let Some(data_dir) = &spec.data_dir {
        println!("  Data directory: {}", data_dir.display());
    }
    println!();

    println!("{}", "Pipeline:".bold());
    println!("  Scoring: {:?}{}", spec.scoring.strategy, model_suffix(&spec.scoring.model));
    println!("  Generation: {:?}{}", spec.generation.strategy, model_suffix(&spec.generation.model));
    println!(
        "  Cognize: min_score={} top_k={} max_concurrency={} fail_fast={}",
        spec.cognize.min_score,
        spec.cognize
            .top_k
            .map(|k| k.to_string())
            .unwrap_or_else(|| "all".to_string()),
        spec.cognize.max_concurrency,
        spec.cognize.fail_fast
    );
    println!("  Instruct: {:?}", spec.instruct.join_strategy);
    println!(
        "  Cache: {}",
        if spec.cache.enabled {
            format!("enabled ({} entries)", spec.cache.capacity)
        } else {
            "disabled".to_string()
        }
    );
    println!();

    println!("{}", "LLM Providers:".bold());
    if spec.llm_providers.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for provider in &spec.llm_providers {
        println!("  {} ({})", provider.name.bold(), provider.provider_type);
        println!("    Endpoint: {}", provider.endpoint);
        for model in &provider.models {
            println!("      - {} → {}", model.alias, model.model);
        }
    }
    println!();

    println!("{}", "Brains:".bold());
    if spec.brains.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for brain in &spec.brains {
        println!(
            "  {} → {} (chunk_size {})",
            brain.name.bold(),
            brain.directory.display(),
            brain.chunk_size
        );
    }

    Ok(())
}

fn model_suffix(model: &Option<String>) -> String {
    model.as_ref().map(|m| format!(" ({})", m)).unwrap_or_default()
}

async fn validate(loaded: &LoadedConfig, check_providers: bool) -> Result<()> {
    println!("Validating configuration...");

    loaded
        .effective
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    if check_providers {
        let providers = ProviderRegistry::from_config(&loaded.effective.spec)
            .context("Failed to initialize LLM providers")?;
        let mut results: Vec<_> = providers.health_check_all().await.into_iter().collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));

        if results.is_empty() {
            println!("  {}", "(no enabled LLM providers)".dimmed());
        }
        let mut failed = 0;
        for (name, result) in &results {
            match result {
                Ok(()) => println!("  {} {}", "✓".green(), name),
                Err(e) => {
                    failed += 1;
                    println!("  {} {}: {}", "✗".red(), name, e);
                }
            }
        }
        if failed > 0 {
            anyhow::bail!("{} LLM provider(s) failed the health check", failed);
        }
    }

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let sample = sample_config(with_examples);
    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}
