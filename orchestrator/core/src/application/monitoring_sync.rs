// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! Monitoring Sync - Background task merging monitoring state into the registry
//!
//! After a warm-up delay, fetches `GET /monitoring` and:
//!
//! 1. stores the account snapshot (auth key, plan, user details),
//! 2. flags every monitored `(backend, machine)` pair it can resolve,
//! 3. turns every rule into a [`MonitoringRule`] and appends it to the rules
//!    collection, then asks the collection to redraw once.
//!
//! Pairs that do not resolve are dropped. Rules that do not resolve keep
//! their raw ids; with [`UnresolvedRulePolicy::RetryOnNextSync`] they are
//! re-attached on a later sync once their machine shows up.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Reconcile monitoring state with the registry
//! - **Collaborators:** [`Session`], [`OperatorRegistry`], [`RulesCollection`]

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::backend::{BackendId, MachineId};
use crate::domain::collaborators::{NotificationSink, OperatorRegistry, RulesCollection, Session};
use crate::domain::config::MonitoringConfig;
use crate::domain::events::{MonitoringEvent, SyncEvent};
use crate::domain::monitoring::{MonitoringAccount, MonitoringPayload, MonitoringRule, RuleId};
use crate::domain::policy::{RetryPolicy, UnresolvedRulePolicy};
use crate::domain::remote::{RegistryRemote, RemoteError};
use crate::infrastructure::registry_store::RegistryStore;

/// Configuration for the monitoring sync
#[derive(Debug, Clone)]
pub struct MonitoringSyncConfig {
    pub enabled: bool,

    /// Delay between start and the first fetch
    pub warmup: Duration,

    /// Repeat period; `None` runs a single sync
    pub interval: Option<Duration>,

    pub retry: RetryPolicy,

    pub unresolved_rules: UnresolvedRulePolicy,
}

impl Default for MonitoringSyncConfig {
    fn default() -> Self {
        Self::from(&MonitoringConfig::default())
    }
}

impl From<&MonitoringConfig> for MonitoringSyncConfig {
    fn from(config: &MonitoringConfig) -> Self {
        Self {
            enabled: config.enabled,
            warmup: config.warmup,
            interval: config.interval,
            retry: config.retry,
            unresolved_rules: config.unresolved_rules,
        }
    }
}

/// Counts from one merge pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub machines_attached: usize,
    pub pairs_dropped: usize,
    pub rules_appended: usize,
    pub rules_unresolved: usize,
    pub rules_reattached: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Session not authenticated
    Skipped,
    Merged(MergeReport),
    /// Fetch failed and the retry policy gave up
    Failed(RemoteError),
    Cancelled,
}

/// Rule ids already handed to the rules collection, plus the raw targets of
/// those still waiting for their machine.
#[derive(Default)]
struct MergedRules {
    seen: HashSet<RuleId>,
    unresolved: BTreeMap<RuleId, (BackendId, MachineId)>,
}

pub struct MonitoringSync {
    remote: Arc<dyn RegistryRemote>,
    store: Arc<RegistryStore>,
    notifier: Arc<dyn NotificationSink>,
    operators: Arc<dyn OperatorRegistry>,
    rules: Arc<dyn RulesCollection>,
    session: Arc<dyn Session>,
    config: MonitoringSyncConfig,
    account: RwLock<Option<MonitoringAccount>>,
    merged: Mutex<MergedRules>,
    shutdown_token: CancellationToken,
}

impl MonitoringSync {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        remote: Arc<dyn RegistryRemote>,
        store: Arc<RegistryStore>,
        notifier: Arc<dyn NotificationSink>,
        operators: Arc<dyn OperatorRegistry>,
        rules: Arc<dyn RulesCollection>,
        session: Arc<dyn Session>,
        config: MonitoringSyncConfig,
    ) -> Self {
        Self {
            remote,
            store,
            notifier,
            operators,
            rules,
            session,
            config,
            account: RwLock::new(None),
            merged: Mutex::new(MergedRules::default()),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = token;
        self
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Account snapshot from the last successful sync
    pub fn account(&self) -> Option<MonitoringAccount> {
        self.account.read().clone()
    }

    /// Start the sync background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Warm up, sync once, then keep syncing if an interval is configured.
    pub async fn run(&self) {
        if !self.config.enabled {
            info!("Monitoring sync is disabled");
            return;
        }

        info!(
            warmup = ?self.config.warmup,
            interval = ?self.config.interval,
            "Starting monitoring sync"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.config.warmup) => {}
            _ = self.shutdown_token.cancelled() => {
                info!("Shutdown signal received during monitoring warm-up");
                return;
            }
        }

        self.sync_once().await;

        let Some(period) = self.config.interval else {
            return;
        };

        let mut tick = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    debug!("Running monitoring sync cycle");
                    self.sync_once().await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping monitoring sync");
                    break;
                }
            }
        }

        info!("Monitoring sync background task stopped");
    }

    /// One fetch-and-merge pass, retried per the configured policy.
    pub async fn sync_once(&self) -> SyncOutcome {
        if !self.session.is_authenticated() {
            debug!("Session is not authenticated, skipping monitoring sync");
            return SyncOutcome::Skipped;
        }

        let mut failures: u32 = 0;

        loop {
            let result = tokio::select! {
                result = self.remote.fetch_monitoring() => result,
                _ = self.shutdown_token.cancelled() => return SyncOutcome::Cancelled,
            };

            match result {
                Ok(payload) => return SyncOutcome::Merged(self.merge(payload)),
                Err(e) => {
                    failures += 1;
                    let delay = self.config.retry.next_delay(failures);
                    warn!(failures, error = %e, retry_in = ?delay, "Failed to check monitoring");

                    self.notifier.notify("Error checking monitoring");
                    self.store
                        .event_bus()
                        .publish_sync_event(SyncEvent::MonitoringFetchFailed {
                            error: e.to_string(),
                            will_retry: delay.is_some(),
                            failed_at: Utc::now(),
                        });

                    let Some(delay) = delay else {
                        return SyncOutcome::Failed(e);
                    };

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.shutdown_token.cancelled() => return SyncOutcome::Cancelled,
                    }
                }
            }
        }
    }

    /// Merge a fetched payload into the registry and the rules collection.
    pub fn merge(&self, payload: MonitoringPayload) -> MergeReport {
        let mut report = MergeReport::default();
        let bus = self.store.event_bus();

        let account = MonitoringAccount::from_payload(&payload);
        for key in &account.monitored_machines {
            if self.store.mark_monitored(key) {
                report.machines_attached += 1;
                bus.publish_monitoring_event(MonitoringEvent::MonitoringAttached {
                    machine: key.clone(),
                    attached_at: Utc::now(),
                });
            } else {
                report.pairs_dropped += 1;
                debug!(machine = %key, "Monitored machine not in registry, dropping");
                bus.publish_monitoring_event(MonitoringEvent::MonitoringPairDropped {
                    machine: key.clone(),
                    dropped_at: Utc::now(),
                });
            }
        }
        *self.account.write() = Some(account);

        let mut merged = self.merged.lock();

        if self.config.unresolved_rules == UnresolvedRulePolicy::RetryOnNextSync {
            let pending: Vec<_> = merged
                .unresolved
                .iter()
                .map(|(id, (b, m))| (id.clone(), b.clone(), m.clone()))
                .collect();

            for (rule_id, backend_id, machine_id) in pending {
                let Some(machine) = self.store.find_machine(&backend_id, &machine_id) else {
                    continue;
                };
                let key = machine.key();
                if self.rules.reattach(&rule_id, key.clone()) {
                    report.rules_reattached += 1;
                    debug!(%rule_id, machine = %key, "Rule re-attached to its machine");
                    bus.publish_monitoring_event(MonitoringEvent::RuleReattached {
                        rule_id: rule_id.clone(),
                        machine: key,
                        reattached_at: Utc::now(),
                    });
                }
                merged.unresolved.remove(&rule_id);
            }
        }

        for (rule_id, descriptor) in payload.rules {
            if merged.seen.contains(&rule_id) {
                continue;
            }

            let operator = self.operators.operator_by_title(&descriptor.operator);
            if operator.is_none() {
                debug!(%rule_id, operator = %descriptor.operator, "Unknown rule operator");
            }

            let resolved = self
                .store
                .find_machine(&descriptor.backend, &descriptor.machine)
                .map(|m| m.key());
            let rule = MonitoringRule::from_descriptor(rule_id.clone(), descriptor, operator, resolved);

            let is_resolved = rule.target.is_resolved();
            if !is_resolved {
                report.rules_unresolved += 1;
                if self.config.unresolved_rules == UnresolvedRulePolicy::RetryOnNextSync {
                    merged.unresolved.insert(
                        rule_id.clone(),
                        (rule.target.backend_id().clone(), rule.target.machine_id().clone()),
                    );
                }
            }

            bus.publish_monitoring_event(MonitoringEvent::RuleMerged {
                rule_id: rule_id.clone(),
                resolved: is_resolved,
                merged_at: Utc::now(),
            });
            self.rules.append(rule);
            merged.seen.insert(rule_id);
            report.rules_appended += 1;
        }
        drop(merged);

        self.rules.redraw();

        info!(
            machines_attached = report.machines_attached,
            pairs_dropped = report.pairs_dropped,
            rules_appended = report.rules_appended,
            rules_unresolved = report.rules_unresolved,
            rules_reattached = report.rules_reattached,
            "Monitoring state merged"
        );

        report
    }
}
