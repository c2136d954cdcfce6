// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! Environment collaborators.
//!
//! The engine never renders anything. It reports to these traits and the host
//! decides what a notification or a redraw means.

use crate::domain::backend::MachineKey;
use crate::domain::monitoring::{MonitoringRule, Operator, RuleId};

/// User-visible error reporting.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str);
}

/// Resolves operator names sent by the server.
pub trait OperatorRegistry: Send + Sync {
    fn operator_by_title(&self, title: &str) -> Option<Operator>;
}

/// External, mutable list of monitoring rules.
pub trait RulesCollection: Send + Sync {
    fn append(&self, rule: MonitoringRule);

    /// Point an already appended rule at a machine that has since appeared.
    /// Returns `false` if the rule is unknown to the collection.
    fn reattach(&self, rule_id: &RuleId, machine: MachineKey) -> bool;

    /// Signal that the collection should re-derive its presentation.
    fn redraw(&self);
}

/// Authentication state of the host session.
pub trait Session: Send + Sync {
    fn is_authenticated(&self) -> bool;
}
