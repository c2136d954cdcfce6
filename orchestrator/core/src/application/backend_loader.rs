// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! Backend Loader - fetch-retry loop for the backend list
//!
//! Fetches `GET /backends` once the host is ready and keeps retrying on
//! failure according to the configured [`RetryPolicy`].
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Populate the registry and keep its `loading_backends` flag honest
//! - **Collaborators:** [`RegistryRemote`], [`RegistryStore`], [`NotificationSink`]
//!
//! ```text
//! Idle ──▶ Loading ──▶ Populated
//!             ▲  │
//!   (delay)   │  ▼
//!             Failed ──(policy exhausted)──▶ stop
//! ```
//!
//! On failure `loading_backends` drops to false straight away, so waiters are
//! not held hostage by an unreachable server. It goes back to true when the
//! retry fires.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::content_loader::ContentLoader;
use crate::domain::backend::{Backend, BackendDescriptor};
use crate::domain::collaborators::NotificationSink;
use crate::domain::events::SyncEvent;
use crate::domain::policy::RetryPolicy;
use crate::domain::remote::RegistryRemote;
use crate::infrastructure::registry_store::RegistryStore;

/// Where the loader is in its fetch-retry cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderState {
    Idle,
    Loading,
    Populated,
    Failed,
}

pub struct BackendLoader {
    remote: Arc<dyn RegistryRemote>,
    store: Arc<RegistryStore>,
    notifier: Arc<dyn NotificationSink>,
    content: Option<ContentLoader>,
    retry: RetryPolicy,
    state_tx: watch::Sender<LoaderState>,
    finished_tx: watch::Sender<Option<LoaderState>>,
    shutdown_token: CancellationToken,
}

impl BackendLoader {
    /// `load_contents` decides whether new backends get their machines and
    /// images fetched after the list arrives.
    pub fn new(
        remote: Arc<dyn RegistryRemote>,
        store: Arc<RegistryStore>,
        notifier: Arc<dyn NotificationSink>,
        retry: RetryPolicy,
        load_contents: bool,
    ) -> Self {
        let content = load_contents.then(|| {
            ContentLoader::new(remote.clone(), store.clone(), notifier.clone())
        });
        let (state_tx, _) = watch::channel(LoaderState::Idle);
        let (finished_tx, _) = watch::channel(None);

        Self {
            remote,
            store,
            notifier,
            content,
            retry,
            state_tx,
            finished_tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Replace the loader's own token, e.g. with a child of the engine's.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = token;
        self
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn state(&self) -> LoaderState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LoaderState> {
        self.state_tx.subscribe()
    }

    /// Holds `None` while the loader runs and its final state once `run`
    /// returns. `Failed` is only final here; [`Self::subscribe_state`] also
    /// reports it between retries.
    pub fn subscribe_finished(&self) -> watch::Receiver<Option<LoaderState>> {
        self.finished_tx.subscribe()
    }

    /// Start the loader as a background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<LoaderState> {
        tokio::spawn(async move { self.run().await })
    }

    /// Run until the list is populated, the retry policy gives up, or
    /// shutdown is requested. Returns the final state.
    pub async fn run(&self) -> LoaderState {
        let state = self.fetch_until_settled().await;
        self.finished_tx.send_replace(Some(state));
        state
    }

    async fn fetch_until_settled(&self) -> LoaderState {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.set_state(LoaderState::Loading);
            self.store.set_loading_backends(true);
            debug!(attempt, "Fetching backend list");

            let result = tokio::select! {
                result = self.remote.fetch_backends() => result,
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, abandoning backend fetch");
                    return self.state();
                }
            };

            match result {
                Ok(descriptors) => {
                    let backends = self.add_backends(descriptors);
                    let count = backends.len();
                    self.store.set_loading_backends(false);

                    self.store
                        .event_bus()
                        .publish_sync_event(SyncEvent::BackendsPopulated {
                            count,
                            attempts: attempt,
                            populated_at: Utc::now(),
                        });
                    self.set_state(LoaderState::Populated);
                    info!(count, attempts = attempt, "Backend list populated");

                    if let Some(content) = &self.content {
                        self.load_contents(content, &backends).await;
                    }

                    return LoaderState::Populated;
                }
                Err(e) => {
                    self.store.set_loading_backends(false);

                    let delay = self.retry.next_delay(attempt);
                    warn!(
                        attempt,
                        error = %e,
                        retry_in = ?delay,
                        "Failed to load backends"
                    );
                    self.notifier.notify("Error loading backends");
                    self.store
                        .event_bus()
                        .publish_sync_event(SyncEvent::BackendFetchFailed {
                            attempt,
                            error: e.to_string(),
                            will_retry: delay.is_some(),
                            failed_at: Utc::now(),
                        });
                    self.set_state(LoaderState::Failed);

                    let Some(delay) = delay else {
                        warn!(attempts = attempt, "Giving up on backend list");
                        return LoaderState::Failed;
                    };

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.shutdown_token.cancelled() => {
                            info!("Shutdown signal received, cancelling backend retry");
                            return LoaderState::Failed;
                        }
                    }
                }
            }
        }
    }

    /// Append the fetched backends in list order. An id the registry already
    /// holds is skipped, so every stored backend has its own id and per-backend
    /// updates reach the entry they were fetched for.
    fn add_backends(&self, descriptors: Vec<BackendDescriptor>) -> Vec<Backend> {
        let load_contents = self.content.is_some();
        let mut added = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if self.store.contains_backend(&descriptor.id) {
                warn!(backend_id = %descriptor.id, "Skipping duplicate backend id");
                continue;
            }
            let backend = Backend::from_descriptor(descriptor, load_contents);
            self.store.add_backend(backend.clone());
            added.push(backend);
        }

        added
    }

    async fn load_contents(&self, content: &ContentLoader, backends: &[Backend]) {
        let loads = backends
            .iter()
            .filter(|b| b.loading_machines || b.loading_images)
            .map(|b| content.load(b));

        tokio::select! {
            _ = futures::future::join_all(loads) => {
                debug!("Backend contents loaded");
            }
            _ = self.shutdown_token.cancelled() => {
                info!("Shutdown signal received, abandoning content loads");
            }
        }
    }

    fn set_state(&self, state: LoaderState) {
        self.state_tx.send_replace(state);
    }
}
