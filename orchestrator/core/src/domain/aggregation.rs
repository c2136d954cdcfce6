// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! Derived registry fields.
//!
//! [`summarize`] is the single reduction that produces every aggregate the
//! registry exposes. It is a commutative fold over the backends, so iteration
//! order never changes the result.

use serde::{Deserialize, Serialize};
use crate::domain::backend::Backend;

/// Aggregates derived from the registry contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub backend_count: usize,
    pub machine_count: usize,
    pub image_count: usize,
    /// True while the backend list itself is being fetched
    pub loading_backends: bool,
    /// True iff at least one backend is loading machines
    pub loading_machines: bool,
    /// True iff at least one backend is loading images
    pub loading_images: bool,
}

impl RegistrySummary {
    /// The backend list and every machine list are loaded. Images may still be
    /// in flight.
    pub fn machines_settled(&self) -> bool {
        !self.loading_backends && !self.loading_machines
    }
}

pub fn summarize(backends: &[Backend], loading_backends: bool) -> RegistrySummary {
    backends.iter().fold(
        RegistrySummary {
            loading_backends,
            ..RegistrySummary::default()
        },
        |acc, backend| RegistrySummary {
            backend_count: acc.backend_count + 1,
            machine_count: acc.machine_count + backend.machines.len(),
            image_count: acc.image_count + backend.images.len(),
            loading_backends: acc.loading_backends,
            loading_machines: acc.loading_machines || backend.loading_machines,
            loading_images: acc.loading_images || backend.loading_images,
        },
    )
}
