// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: entities, the registry aggregate, derived state, policies,
//! and the interfaces the engine expects its environment to provide.

pub mod backend;
pub mod aggregation;
pub mod lookup;
pub mod registry;
pub mod monitoring;
pub mod events;
pub mod policy;
pub mod remote;
pub mod collaborators;
pub mod config;
