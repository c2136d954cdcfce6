// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Registry Aggregate
//!
//! The [`Registry`] is the aggregate root for everything the client knows about
//! the server: the ordered backend list and the [`RegistrySummary`] derived from
//! it.
//!
//! Every mutating method ends by calling `refresh_summary`, so the summary is
//! never observed out of step with the collections. The registry is
//! append-only: backends are never removed.

use serde::Serialize;
use thiserror::Error;

use crate::domain::aggregation::{summarize, RegistrySummary};
use crate::domain::backend::{
    Backend, BackendId, Collection, Image, ImageDescriptor, Machine, MachineDescriptor, MachineId,
    MachineKey,
};
use crate::domain::lookup;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Backend not found: {0}")]
    UnknownBackend(BackendId),
}

#[derive(Debug, Clone, Serialize)]
pub struct Registry {
    backends: Vec<Backend>,
    loading_backends: bool,
    summary: RegistrySummary,
}

impl Registry {
    /// An empty registry. The backend list counts as loading until the first
    /// fetch settles.
    pub fn new() -> Self {
        let mut registry = Self {
            backends: Vec::new(),
            loading_backends: true,
            summary: RegistrySummary::default(),
        };
        registry.refresh_summary();
        registry
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    pub fn summary(&self) -> RegistrySummary {
        self.summary
    }

    pub fn loading_backends(&self) -> bool {
        self.loading_backends
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn add_backend(&mut self, backend: Backend) -> BackendId {
        let id = backend.id.clone();
        self.backends.push(backend);
        self.refresh_summary();
        id
    }

    pub fn set_loading_backends(&mut self, loading: bool) {
        self.loading_backends = loading;
        self.refresh_summary();
    }

    pub fn set_loading(
        &mut self,
        backend_id: &BackendId,
        collection: Collection,
        loading: bool,
    ) -> Result<(), StoreError> {
        self.backend_mut(backend_id)?.set_loading(collection, loading);
        self.refresh_summary();
        Ok(())
    }

    /// Replace a backend's machine list. Monitoring flags already set on
    /// machines that survive the replacement are kept.
    pub fn replace_machines(
        &mut self,
        backend_id: &BackendId,
        machines: Vec<MachineDescriptor>,
    ) -> Result<usize, StoreError> {
        let backend = self.backend_mut(backend_id)?;
        let replaced: Vec<Machine> = machines
            .into_iter()
            .map(|descriptor| {
                let monitored = backend
                    .machine(&descriptor.id)
                    .map(|m| m.has_monitoring)
                    .unwrap_or(false);
                let mut machine = Machine::from_descriptor(backend_id, descriptor);
                machine.has_monitoring = monitored;
                machine
            })
            .collect();
        let count = replaced.len();
        backend.machines = replaced;
        self.refresh_summary();
        Ok(count)
    }

    pub fn replace_images(
        &mut self,
        backend_id: &BackendId,
        images: Vec<ImageDescriptor>,
    ) -> Result<usize, StoreError> {
        let backend = self.backend_mut(backend_id)?;
        backend.images = images
            .into_iter()
            .map(|descriptor| Image::from_descriptor(backend_id, descriptor))
            .collect();
        let count = backend.images.len();
        self.refresh_summary();
        Ok(count)
    }

    /// Flag the machine addressed by `key` as monitored. Returns `false` when
    /// the key does not resolve.
    pub fn mark_monitored(&mut self, key: &MachineKey) -> bool {
        let machine = self
            .backends
            .iter_mut()
            .find(|b| b.id == key.backend_id)
            .and_then(|b| b.machine_mut(&key.machine_id));

        match machine {
            Some(machine) => {
                machine.has_monitoring = true;
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn find_backend(&self, backend_id: &BackendId) -> Option<&Backend> {
        lookup::find_backend(&self.backends, backend_id)
    }

    pub fn find_machine(&self, backend_id: &BackendId, machine_id: &MachineId) -> Option<&Machine> {
        lookup::find_machine(&self.backends, backend_id, machine_id)
    }

    pub fn find_machine_any_backend(&self, machine_id: &MachineId) -> Option<&Machine> {
        lookup::find_machine_any_backend(&self.backends, machine_id)
    }

    fn backend_mut(&mut self, backend_id: &BackendId) -> Result<&mut Backend, StoreError> {
        self.backends
            .iter_mut()
            .find(|b| &b.id == backend_id)
            .ok_or_else(|| StoreError::UnknownBackend(backend_id.clone()))
    }

    fn refresh_summary(&mut self) {
        self.summary = summarize(&self.backends, self.loading_backends);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
