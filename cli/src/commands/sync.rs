// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

//! Registry sync command
//!
//! Runs the sync engine against the configured server until Ctrl-C, or until
//! the registry has loaded when `--once` is given, then prints a summary.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use mist_core::application::backend_loader::LoaderState;
use mist_core::application::engine::{Collaborators, SyncEngine};
use mist_core::domain::collaborators::NotificationSink;
use mist_core::domain::config::SyncConfig;
use mist_core::infrastructure::collaborators::{
    InMemoryRulesCollection, StaticOperatorRegistry, StaticSession,
};
use mist_core::infrastructure::http_remote::HttpRegistryRemote;

/// Prints user notifications to stderr.
struct ConsoleNotificationSink;

impl NotificationSink for ConsoleNotificationSink {
    fn notify(&self, message: &str) {
        eprintln!("{} {}", "!".yellow().bold(), message.yellow());
    }
}

pub async fn run(config_path: Option<PathBuf>, once: bool) -> Result<()> {
    let config = SyncConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    let remote = HttpRegistryRemote::new(&config.server)
        .context("Failed to build HTTP client")?;
    let rules = Arc::new(InMemoryRulesCollection::new());

    let engine = SyncEngine::new(
        &config,
        Collaborators {
            remote: Arc::new(remote),
            notifier: Arc::new(ConsoleNotificationSink),
            operators: Arc::new(StaticOperatorRegistry::default()),
            rules: rules.clone(),
            session: Arc::new(StaticSession::new(config.session.authenticated)),
        },
    );

    info!(server = %config.server.base_url, "Starting registry sync");
    engine.start(async {});

    if once {
        tokio::select! {
            _ = wait_until_loaded(&engine) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted before the registry finished loading");
            }
        }
    } else {
        println!("{}", "Syncing registry, press Ctrl-C to stop".dimmed());
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
    }

    engine.shutdown().await;
    print_summary(&engine, &rules);

    Ok(())
}

/// Wait for the loader to finish, then for every backend's machines and
/// images. Stops early when the loader gave up on the backend list.
async fn wait_until_loaded(engine: &SyncEngine) {
    let mut finished = engine.loader().subscribe_finished();
    let state = match finished.wait_for(Option::is_some).await {
        Ok(state) => *state,
        Err(_) => return,
    };
    if state != Some(LoaderState::Populated) {
        warn!(?state, "Backend list did not load");
        return;
    }

    let mut summary = engine.subscribe_summary();
    let _ = summary
        .wait_for(|s| s.machines_settled() && !s.loading_images)
        .await;
}

fn print_summary(engine: &SyncEngine, rules: &InMemoryRulesCollection) {
    let summary = engine.summary();

    println!();
    println!("{}", "Registry summary:".bold());
    println!("  Backends: {}", summary.backend_count);
    println!(
        "  Machines: {}{}",
        summary.machine_count,
        if summary.loading_machines { " (loading)".dimmed().to_string() } else { String::new() }
    );
    println!(
        "  Images: {}{}",
        summary.image_count,
        if summary.loading_images { " (loading)".dimmed().to_string() } else { String::new() }
    );
    println!();

    let backends = engine.store().backends();
    if !backends.is_empty() {
        println!("{}", "Backends:".bold());
        for backend in &backends {
            let monitored = backend.machines.iter().filter(|m| m.has_monitoring).count();
            let provider = engine
                .providers()
                .title_for(&backend.provider)
                .unwrap_or(if backend.provider.is_empty() { "unknown" } else { backend.provider.as_str() });
            println!(
                "  {} ({}): {} machines, {} images, {} monitored",
                backend.display_name().bold(),
                provider,
                backend.machines.len(),
                backend.images.len(),
                monitored
            );
        }
        println!();
    }

    let merged = rules.rules();
    let unresolved = merged.iter().filter(|r| !r.target.is_resolved()).count();
    println!("{}", "Monitoring:".bold());
    match engine.monitoring().account() {
        Some(account) => {
            println!("  Monitored machines: {}", account.monitored_machines.len());
            println!("  Rules: {} ({} unresolved)", merged.len(), unresolved);
        }
        None => println!("  {}", "(not synced)".dimmed()),
    }
}
