// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Remote Registry Interface
//!
//! The only capability the engine needs from the transport: fetch JSON from a
//! handful of endpoints. Implemented over HTTP by
//! `crate::infrastructure::http_remote::HttpRegistryRemote`; tests supply
//! in-memory doubles.
//!
//! | Method | Endpoint |
//! |--------|----------|
//! | `fetch_backends` | `GET /backends` |
//! | `fetch_machines` | `GET /backends/{id}/machines` |
//! | `fetch_images` | `GET /backends/{id}/images` |
//! | `fetch_monitoring` | `GET /monitoring` |

use async_trait::async_trait;

use crate::domain::backend::{BackendDescriptor, BackendId, ImageDescriptor, MachineDescriptor};
use crate::domain::monitoring::MonitoringPayload;

#[async_trait]
pub trait RegistryRemote: Send + Sync {
    async fn fetch_backends(&self) -> Result<Vec<BackendDescriptor>, RemoteError>;

    async fn fetch_machines(&self, backend_id: &BackendId) -> Result<Vec<MachineDescriptor>, RemoteError>;

    async fn fetch_images(&self, backend_id: &BackendId) -> Result<Vec<ImageDescriptor>, RemoteError>;

    async fn fetch_monitoring(&self) -> Result<MonitoringPayload, RemoteError>;
}

/// Transient fetch failures. None of them are fatal to the engine.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}
