// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Mist CLI

pub mod config;
pub mod sync;

pub use self::config::ConfigCommand;
