// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! Mist registry core
//!
//! Keeps the client-side registry of cloud backends, their machines and
//! images in sync with a Mist server, and merges monitoring state into it.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, sync services and their adapters
//!
//! ```text
//! domain/          entities, registry aggregate, config, collaborator traits
//! application/     backend loader, content loader, monitoring sync, engine
//! infrastructure/  registry store, event bus, HTTP remote, default collaborators
//! ```

pub mod domain;
pub mod application;
pub mod infrastructure;
