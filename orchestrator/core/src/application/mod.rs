// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod backend_loader;
pub mod content_loader;
pub mod monitoring_sync;
pub mod machine_request;
pub mod engine;

// Re-export services for convenience
pub use backend_loader::{BackendLoader, LoaderState};
pub use content_loader::ContentLoader;
pub use engine::{Collaborators, SyncEngine};
pub use machine_request::{LookupError, MachineRequestSlot, MachineResponse};
pub use monitoring_sync::{MergeReport, MonitoringSync, MonitoringSyncConfig, SyncOutcome};
