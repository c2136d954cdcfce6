// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use mist_core::domain::config::SyncConfig;
use mist_core::domain::policy::RetryPolicy;

const MINIMAL_TEMPLATE: &str = include_str!("../../templates/config-minimal.yaml");
const EXAMPLES_TEMPLATE: &str = include_str!("../../templates/config-with-examples.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./mist-config.yaml)
        #[arg(short, long, default_value = "./mist-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = SyncConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. MIST_CONFIG_PATH: {}",
            std::env::var("MIST_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./mist-config.yaml");
        println!("  4. ~/.mist/config.yaml");
        println!("  5. /etc/mist/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Server:".bold());
    println!("  URL: {}", config.server.base_url);
    println!(
        "  API key: {}",
        if config.server.api_key.is_some() { "(set)" } else { "(none)" }
    );
    println!("  Request timeout: {:?}", config.server.request_timeout);
    println!("  Authenticated session: {}", config.session.authenticated);
    println!();

    println!("{}", "Backends:".bold());
    println!("  Retry: {}", describe_retry(&config.backends.retry));
    println!("  Load contents: {}", config.backends.load_contents);
    if config.backends.providers.is_empty() {
        println!("  Providers: {}", "(none listed)".dimmed());
    } else {
        println!("  Providers:");
        for entry in &config.backends.providers {
            println!("    {} ({})", entry.title, entry.provider);
        }
    }
    println!();

    println!("{}", "Monitoring:".bold());
    println!("  Enabled: {}", config.monitoring.enabled);
    println!("  Warm-up: {:?}", config.monitoring.warmup);
    match config.monitoring.interval {
        Some(interval) => println!("  Interval: {:?}", interval),
        None => println!("  Interval: {}", "(run once)".dimmed()),
    }
    println!("  Retry: {}", describe_retry(&config.monitoring.retry));
    println!("  Unresolved rules: {:?}", config.monitoring.unresolved_rules);
    println!();

    println!("{}", "Lookup:".bold());
    println!("  Settle timeout: {:?}", config.lookup.settle_timeout);
    println!();

    Ok(())
}

fn describe_retry(policy: &RetryPolicy) -> String {
    match policy {
        RetryPolicy::Never => "never".to_string(),
        RetryPolicy::Indefinite { delay } => format!("every {:?}, indefinitely", delay),
        RetryPolicy::Bounded { delay, max_attempts } => {
            format!("every {:?}, at most {} attempts", delay, max_attempts)
        }
    }
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = SyncConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        EXAMPLES_TEMPLATE
    } else {
        MINIMAL_TEMPLATE
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
