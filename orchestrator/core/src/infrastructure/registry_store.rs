// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

//! In-memory Registry Store
//!
//! The single coordination point for the [`Registry`] aggregate. Fetch tasks
//! run concurrently, but every mutation is funneled through one write lock.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Own the registry, serialize writers, publish changes
//! - **Pattern:** Repository (DDD), single-writer discipline
//!
//! After each mutation the store compares the derived summary with its value
//! before the write. When it changed, the new summary is pushed to a
//! `tokio::sync::watch` channel and a `SummaryChanged` event is published.
//! Both happen under the write lock so observers never see summaries out of
//! order.

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;

use crate::domain::aggregation::RegistrySummary;
use crate::domain::backend::{
    Backend, BackendId, Collection, ImageDescriptor, Machine, MachineDescriptor, MachineId,
    MachineKey,
};
use crate::domain::events::StoreEvent;
use crate::domain::registry::{Registry, StoreError};
use crate::infrastructure::event_bus::EventBus;

pub struct RegistryStore {
    registry: RwLock<Registry>,
    summary_tx: watch::Sender<RegistrySummary>,
    event_bus: EventBus,
}

impl RegistryStore {
    pub fn new(event_bus: EventBus) -> Self {
        let registry = Registry::new();
        let (summary_tx, _) = watch::channel(registry.summary());
        Self {
            registry: RwLock::new(registry),
            summary_tx,
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn summary(&self) -> RegistrySummary {
        self.registry.read().summary()
    }

    /// Watch the derived summary. The receiver sees every distinct value in
    /// write order (intermediate values may be coalesced).
    pub fn subscribe_summary(&self) -> watch::Receiver<RegistrySummary> {
        self.summary_tx.subscribe()
    }

    /// A consistent copy of the whole registry
    pub fn snapshot(&self) -> Registry {
        self.registry.read().clone()
    }

    pub fn backends(&self) -> Vec<Backend> {
        self.registry.read().backends().to_vec()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn add_backend(&self, backend: Backend) -> BackendId {
        let provider = backend.provider.clone();
        self.mutate(|registry, bus| {
            let id = registry.add_backend(backend);
            debug!(backend_id = %id, "Backend added to registry");
            bus.publish_store_event(StoreEvent::BackendAdded {
                backend_id: id.clone(),
                provider,
                added_at: Utc::now(),
            });
            id
        })
    }

    pub fn set_loading_backends(&self, loading: bool) {
        self.mutate(|registry, _| registry.set_loading_backends(loading))
    }

    pub fn set_loading(
        &self,
        backend_id: &BackendId,
        collection: Collection,
        loading: bool,
    ) -> Result<(), StoreError> {
        self.mutate(|registry, bus| {
            registry.set_loading(backend_id, collection, loading)?;
            bus.publish_store_event(StoreEvent::LoadingChanged {
                backend_id: backend_id.clone(),
                collection,
                loading,
                changed_at: Utc::now(),
            });
            Ok(())
        })
    }

    pub fn replace_machines(
        &self,
        backend_id: &BackendId,
        machines: Vec<MachineDescriptor>,
    ) -> Result<usize, StoreError> {
        self.mutate(|registry, bus| {
            let count = registry.replace_machines(backend_id, machines)?;
            bus.publish_store_event(StoreEvent::CollectionReplaced {
                backend_id: backend_id.clone(),
                collection: Collection::Machines,
                count,
                replaced_at: Utc::now(),
            });
            Ok(count)
        })
    }

    pub fn replace_images(
        &self,
        backend_id: &BackendId,
        images: Vec<ImageDescriptor>,
    ) -> Result<usize, StoreError> {
        self.mutate(|registry, bus| {
            let count = registry.replace_images(backend_id, images)?;
            bus.publish_store_event(StoreEvent::CollectionReplaced {
                backend_id: backend_id.clone(),
                collection: Collection::Images,
                count,
                replaced_at: Utc::now(),
            });
            Ok(count)
        })
    }

    pub fn mark_monitored(&self, key: &MachineKey) -> bool {
        self.mutate(|registry, _| registry.mark_monitored(key))
    }

    // ------------------------------------------------------------------
    // Lookups (cloned out of the lock)
    // ------------------------------------------------------------------

    pub fn contains_backend(&self, backend_id: &BackendId) -> bool {
        self.registry.read().find_backend(backend_id).is_some()
    }

    pub fn find_backend(&self, backend_id: &BackendId) -> Option<Backend> {
        self.registry.read().find_backend(backend_id).cloned()
    }

    pub fn find_machine(&self, backend_id: &BackendId, machine_id: &MachineId) -> Option<Machine> {
        self.registry
            .read()
            .find_machine(backend_id, machine_id)
            .cloned()
    }

    pub fn find_machine_any_backend(&self, machine_id: &MachineId) -> Option<Machine> {
        self.registry
            .read()
            .find_machine_any_backend(machine_id)
            .cloned()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Registry, &EventBus) -> R) -> R {
        let mut registry = self.registry.write();
        let before = registry.summary();
        let result = f(&mut *registry, &self.event_bus);
        let after = registry.summary();

        if before != after {
            self.summary_tx.send_replace(after);
            self.event_bus.publish_store_event(StoreEvent::SummaryChanged {
                summary: after,
                changed_at: Utc::now(),
            });
        }

        result
    }
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new(EventBus::with_default_capacity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backend::BackendDescriptor;
    use crate::infrastructure::event_bus::RegistryEvent;

    #[test]
    fn test_summary_watch_follows_mutations() {
        let store = RegistryStore::default();
        let rx = store.subscribe_summary();
        assert!(rx.borrow().loading_backends);

        let id = store.add_backend(Backend::from_descriptor(BackendDescriptor::new("b1"), true));
        store
            .replace_machines(&id, vec![MachineDescriptor { id: "m1".into(), name: None, state: None }])
            .unwrap();
        store.set_loading_backends(false);

        let summary = *rx.borrow();
        assert_eq!(summary, store.summary());
        assert_eq!(summary.machine_count, 1);
        assert!(!summary.loading_backends);
        assert!(summary.loading_machines);
    }

    #[test]
    fn test_summary_event_only_on_change() {
        let store = RegistryStore::default();
        let mut events = store.event_bus().subscribe();

        // Already loading: no derived field changes
        store.set_loading_backends(true);
        assert!(events.try_recv().is_err());

        store.set_loading_backends(false);
        match events.try_recv().unwrap() {
            RegistryEvent::Store(StoreEvent::SummaryChanged { summary, .. }) => {
                assert!(!summary.loading_backends);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_lookups_return_owned_copies() {
        let store = RegistryStore::default();
        let id = store.add_backend(Backend::from_descriptor(BackendDescriptor::new("b1"), false));
        store
            .replace_machines(&id, vec![MachineDescriptor { id: "m1".into(), name: None, state: None }])
            .unwrap();

        let machine = store.find_machine(&id, &"m1".into()).unwrap();
        assert!(store.mark_monitored(&machine.key()));
        assert!(!machine.has_monitoring);
        assert!(store.find_machine_any_backend(&"m1".into()).unwrap().has_monitoring);
    }
}
