// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! Deferred Machine Request
//!
//! Resolves a machine by id alone, but only once the registry has settled:
//! the backend list is loaded and no backend is still loading machines.
//! Waiting is done on the store's summary watch channel, bounded by a timeout
//! and a cancellation token.
//!
//! The slot holds at most one pending request. A new request cancels the
//! previous one. When a request resolves, the response is published and the
//! request is cleared.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::backend::{Machine, MachineId};
use crate::infrastructure::registry_store::RegistryStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Registry did not settle within {0:?}")]
    Timeout(Duration),

    #[error("Machine request cancelled")]
    Cancelled,
}

/// Answer to a deferred request. `machine` is `None` when no backend has a
/// machine with that id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineResponse {
    pub machine_id: MachineId,
    pub machine: Option<Machine>,
}

/// Wait until neither the backend list nor any backend's machines are loading.
pub async fn wait_until_settled(
    store: &RegistryStore,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), LookupError> {
    let mut summary = store.subscribe_summary();
    let settled = async move {
        summary
            .wait_for(|s| s.machines_settled())
            .await
            .map(|_| ())
    };

    tokio::select! {
        result = tokio::time::timeout(timeout, settled) => match result {
            Ok(Ok(())) => Ok(()),
            // Summary sender dropped with the store
            Ok(Err(_)) => Err(LookupError::Cancelled),
            Err(_) => Err(LookupError::Timeout(timeout)),
        },
        _ = cancel.cancelled() => Err(LookupError::Cancelled),
    }
}

pub struct MachineRequestSlot {
    store: Arc<RegistryStore>,
    settle_timeout: Duration,
    request_tx: watch::Sender<Option<MachineId>>,
    response_tx: watch::Sender<Option<MachineResponse>>,
    current: Mutex<Option<CancellationToken>>,
    shutdown_token: CancellationToken,
}

impl MachineRequestSlot {
    pub fn new(store: Arc<RegistryStore>, settle_timeout: Duration) -> Self {
        let (request_tx, _) = watch::channel(None);
        let (response_tx, _) = watch::channel(None);

        Self {
            store,
            settle_timeout,
            request_tx,
            response_tx,
            current: Mutex::new(None),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = token;
        self
    }

    /// Resolve `machine_id` directly, waiting for the registry to settle.
    pub async fn resolve(&self, machine_id: &MachineId) -> Result<Option<Machine>, LookupError> {
        wait_until_settled(&self.store, self.settle_timeout, &self.shutdown_token).await?;
        Ok(self.store.find_machine_any_backend(machine_id))
    }

    /// Set the requested machine id. Resolution happens in the background;
    /// watch [`Self::subscribe_response`] for the answer.
    pub fn request(self: &Arc<Self>, machine_id: MachineId) -> tokio::task::JoinHandle<()> {
        let token = self.shutdown_token.child_token();
        if let Some(previous) = self.current.lock().replace(token.clone()) {
            previous.cancel();
        }

        debug!(%machine_id, "Machine requested");
        self.request_tx.send_replace(Some(machine_id.clone()));

        let slot = Arc::clone(self);
        tokio::spawn(async move {
            slot.serve(machine_id, token).await;
        })
    }

    /// Drop the pending request, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.current.lock().take() {
            token.cancel();
        }
        self.request_tx.send_replace(None);
    }

    pub fn pending(&self) -> Option<MachineId> {
        self.request_tx.borrow().clone()
    }

    pub fn response(&self) -> Option<MachineResponse> {
        self.response_tx.borrow().clone()
    }

    pub fn subscribe_response(&self) -> watch::Receiver<Option<MachineResponse>> {
        self.response_tx.subscribe()
    }

    async fn serve(&self, machine_id: MachineId, token: CancellationToken) {
        match wait_until_settled(&self.store, self.settle_timeout, &token).await {
            Ok(()) if !token.is_cancelled() => {
                let machine = self.store.find_machine_any_backend(&machine_id);
                debug!(%machine_id, found = machine.is_some(), "Machine request resolved");

                self.response_tx.send_replace(Some(MachineResponse {
                    machine_id: machine_id.clone(),
                    machine,
                }));
                self.clear_request(&machine_id);
            }
            Ok(()) | Err(LookupError::Cancelled) => {
                debug!(%machine_id, "Machine request cancelled");
            }
            Err(e @ LookupError::Timeout(_)) => {
                warn!(%machine_id, error = %e, "Machine request abandoned");
                self.clear_request(&machine_id);
            }
        }
    }

    fn clear_request(&self, machine_id: &MachineId) {
        self.request_tx.send_if_modified(|pending| {
            if pending.as_ref() == Some(machine_id) {
                *pending = None;
                true
            } else {
                false
            }
        });
    }
}
