// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod registry_store;
pub mod http_remote;
pub mod collaborators;

pub use event_bus::{EventBus, EventBusError, EventReceiver, RegistryEvent};
pub use http_remote::HttpRegistryRemote;
pub use registry_store::RegistryStore;
