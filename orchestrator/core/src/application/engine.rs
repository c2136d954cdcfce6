// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! Sync Engine - wires the registry store and its background tasks
//!
//! Once the host's readiness future resolves, the engine runs the backend
//! loader and the monitoring sync side by side. The monitoring warm-up is
//! counted from readiness, not from the end of the backend load.
//!
//! Every task observes a child of the engine's cancellation token, so
//! [`SyncEngine::shutdown`] stops pending fetches, retry timers and deferred
//! requests alike.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::backend_loader::BackendLoader;
use crate::application::machine_request::MachineRequestSlot;
use crate::application::monitoring_sync::{MonitoringSync, MonitoringSyncConfig};
use crate::domain::aggregation::RegistrySummary;
use crate::domain::collaborators::{NotificationSink, OperatorRegistry, RulesCollection, Session};
use crate::domain::config::SyncConfig;
use crate::domain::remote::RegistryRemote;
use crate::infrastructure::collaborators::StaticProviderCatalog;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::registry_store::RegistryStore;

/// Everything the engine consumes from its host
#[derive(Clone)]
pub struct Collaborators {
    pub remote: Arc<dyn RegistryRemote>,
    pub notifier: Arc<dyn NotificationSink>,
    pub operators: Arc<dyn OperatorRegistry>,
    pub rules: Arc<dyn RulesCollection>,
    pub session: Arc<dyn Session>,
}

pub struct SyncEngine {
    store: Arc<RegistryStore>,
    loader: Arc<BackendLoader>,
    monitoring: Arc<MonitoringSync>,
    machine_request: Arc<MachineRequestSlot>,
    providers: StaticProviderCatalog,
    shutdown_token: CancellationToken,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncEngine {
    pub fn new(config: &SyncConfig, collaborators: Collaborators) -> Self {
        Self::with_event_bus(config, collaborators, EventBus::with_default_capacity())
    }

    pub fn with_event_bus(config: &SyncConfig, collaborators: Collaborators, event_bus: EventBus) -> Self {
        let shutdown_token = CancellationToken::new();
        let store = Arc::new(RegistryStore::new(event_bus));

        let loader = BackendLoader::new(
            collaborators.remote.clone(),
            store.clone(),
            collaborators.notifier.clone(),
            config.backends.retry,
            config.backends.load_contents,
        )
        .with_shutdown_token(shutdown_token.child_token());

        let monitoring = MonitoringSync::new(
            collaborators.remote,
            store.clone(),
            collaborators.notifier,
            collaborators.operators,
            collaborators.rules,
            collaborators.session,
            MonitoringSyncConfig::from(&config.monitoring),
        )
        .with_shutdown_token(shutdown_token.child_token());

        let machine_request = MachineRequestSlot::new(store.clone(), config.lookup.settle_timeout)
            .with_shutdown_token(shutdown_token.child_token());

        Self {
            store,
            loader: Arc::new(loader),
            monitoring: Arc::new(monitoring),
            machine_request: Arc::new(machine_request),
            providers: StaticProviderCatalog::new(config.backends.providers.clone()),
            shutdown_token,
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the sync tasks; they begin once `ready` resolves. Only the first
    /// call spawns anything, so the backend list is fetched once per engine.
    /// Returns whether this call started the engine.
    pub fn start<F>(&self, ready: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Sync engine already started, ignoring start request");
            return false;
        }

        let loader = self.loader.clone();
        let monitoring = self.monitoring.clone();
        let token = self.shutdown_token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = ready => {}
                _ = token.cancelled() => {
                    info!("Shutdown signal received before host was ready");
                    return;
                }
            }

            info!("Host ready, starting registry sync");
            let (state, ()) = tokio::join!(loader.run(), monitoring.run());
            info!(?state, "Registry sync tasks finished");
        });

        self.tasks.lock().push(handle);
        true
    }

    pub fn store(&self) -> &Arc<RegistryStore> {
        &self.store
    }

    pub fn event_bus(&self) -> &EventBus {
        self.store.event_bus()
    }

    pub fn loader(&self) -> &Arc<BackendLoader> {
        &self.loader
    }

    pub fn monitoring(&self) -> &Arc<MonitoringSync> {
        &self.monitoring
    }

    pub fn machine_request(&self) -> &Arc<MachineRequestSlot> {
        &self.machine_request
    }

    /// Provider kinds from the configuration, for labelling backends
    pub fn providers(&self) -> &StaticProviderCatalog {
        &self.providers
    }

    pub fn summary(&self) -> RegistrySummary {
        self.store.summary()
    }

    pub fn subscribe_summary(&self) -> watch::Receiver<RegistrySummary> {
        self.store.subscribe_summary()
    }

    /// Cancel every task and wait for them to stop.
    pub async fn shutdown(&self) {
        info!("Shutting down sync engine");
        self.shutdown_token.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                warn!(error = %e, "Sync task ended abnormally");
            }
        }
    }
}
