// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregation::RegistrySummary;
use crate::domain::backend::{BackendId, Collection, MachineKey};
use crate::domain::monitoring::RuleId;

/// Changes to the registry contents, published after the mutation is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreEvent {
    BackendAdded {
        backend_id: BackendId,
        provider: String,
        added_at: DateTime<Utc>,
    },
    CollectionReplaced {
        backend_id: BackendId,
        collection: Collection,
        count: usize,
        replaced_at: DateTime<Utc>,
    },
    LoadingChanged {
        backend_id: BackendId,
        collection: Collection,
        loading: bool,
        changed_at: DateTime<Utc>,
    },
    /// Emitted only when at least one derived field actually changed
    SummaryChanged {
        summary: RegistrySummary,
        changed_at: DateTime<Utc>,
    },
}

/// Outcomes of the fetch loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncEvent {
    BackendsPopulated {
        count: usize,
        attempts: u32,
        populated_at: DateTime<Utc>,
    },
    BackendFetchFailed {
        attempt: u32,
        error: String,
        will_retry: bool,
        failed_at: DateTime<Utc>,
    },
    ContentFetchFailed {
        backend_id: BackendId,
        collection: Collection,
        error: String,
        failed_at: DateTime<Utc>,
    },
    MonitoringFetchFailed {
        error: String,
        will_retry: bool,
        failed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MonitoringEvent {
    MonitoringAttached {
        machine: MachineKey,
        attached_at: DateTime<Utc>,
    },
    /// A monitored pair named a machine the registry does not hold
    MonitoringPairDropped {
        machine: MachineKey,
        dropped_at: DateTime<Utc>,
    },
    RuleMerged {
        rule_id: RuleId,
        resolved: bool,
        merged_at: DateTime<Utc>,
    },
    RuleReattached {
        rule_id: RuleId,
        machine: MachineKey,
        reattached_at: DateTime<Utc>,
    },
}
