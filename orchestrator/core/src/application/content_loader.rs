// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

//! Content Loader
//!
//! Fills in the machine and image collections of a freshly added backend.
//! Both fetches run concurrently; each collection's loading flag is cleared
//! when its own fetch completes, whether it succeeded or not.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::backend::{Backend, Collection};
use crate::domain::collaborators::NotificationSink;
use crate::domain::events::SyncEvent;
use crate::domain::registry::StoreError;
use crate::domain::remote::{RegistryRemote, RemoteError};
use crate::infrastructure::registry_store::RegistryStore;

pub struct ContentLoader {
    remote: Arc<dyn RegistryRemote>,
    store: Arc<RegistryStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl ContentLoader {
    pub fn new(
        remote: Arc<dyn RegistryRemote>,
        store: Arc<RegistryStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            remote,
            store,
            notifier,
        }
    }

    /// Load whichever collections of `backend` are still flagged as loading.
    pub async fn load(&self, backend: &Backend) {
        let id = &backend.id;

        let machines = async {
            if backend.loading_machines {
                Some(self.remote.fetch_machines(id).await)
            } else {
                None
            }
        };
        let images = async {
            if backend.loading_images {
                Some(self.remote.fetch_images(id).await)
            } else {
                None
            }
        };

        let (machines, images) = tokio::join!(machines, images);

        if let Some(result) = machines {
            let outcome = result.map(|list| self.store.replace_machines(id, list));
            self.finish(backend, Collection::Machines, outcome);
        }
        if let Some(result) = images {
            let outcome = result.map(|list| self.store.replace_images(id, list));
            self.finish(backend, Collection::Images, outcome);
        }
    }

    fn finish(
        &self,
        backend: &Backend,
        collection: Collection,
        outcome: Result<Result<usize, StoreError>, RemoteError>,
    ) {
        match outcome {
            Ok(Ok(count)) => {
                debug!(backend_id = %backend.id, %collection, count, "Collection loaded");
            }
            Ok(Err(e)) => {
                // Backend id unknown to the store
                warn!(backend_id = %backend.id, %collection, error = %e, "Dropping fetched collection");
            }
            Err(e) => {
                warn!(backend_id = %backend.id, %collection, error = %e, "Failed to load collection");
                self.notifier.notify(&format!(
                    "Error loading {} for {}",
                    collection,
                    backend.display_name()
                ));
                self.store
                    .event_bus()
                    .publish_sync_event(SyncEvent::ContentFetchFailed {
                        backend_id: backend.id.clone(),
                        collection,
                        error: e.to_string(),
                        failed_at: Utc::now(),
                    });
            }
        }

        if let Err(e) = self.store.set_loading(&backend.id, collection, false) {
            warn!(backend_id = %backend.id, %collection, error = %e, "Could not clear loading flag");
        }
    }
}

