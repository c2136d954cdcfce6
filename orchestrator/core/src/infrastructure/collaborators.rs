// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

//! Default collaborator implementations for hosts without a UI.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, warn};

use crate::domain::backend::{MachineKey, Provider};
use crate::domain::collaborators::{NotificationSink, OperatorRegistry, RulesCollection, Session};
use crate::domain::monitoring::{MonitoringRule, Operator, RuleId, RuleTarget};

/// Sends notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, message: &str) {
        warn!(notification = message, "User notification");
    }
}

/// The comparison operators offered by the rules UI.
#[derive(Debug, Clone)]
pub struct StaticOperatorRegistry {
    operators: Vec<Operator>,
}

impl StaticOperatorRegistry {
    pub fn new(operators: Vec<Operator>) -> Self {
        Self { operators }
    }
}

impl Default for StaticOperatorRegistry {
    fn default() -> Self {
        Self::new(vec![Operator::new("gt", ">"), Operator::new("lt", "<")])
    }
}

impl OperatorRegistry for StaticOperatorRegistry {
    fn operator_by_title(&self, title: &str) -> Option<Operator> {
        self.operators.iter().find(|op| op.title == title).cloned()
    }
}

/// The provider kinds a host supports, in display order.
#[derive(Debug, Clone, Default)]
pub struct StaticProviderCatalog {
    providers: Vec<Provider>,
}

impl StaticProviderCatalog {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn title_for(&self, provider: &str) -> Option<&str> {
        self.providers
            .iter()
            .find(|p| p.provider == provider)
            .map(|p| p.title.as_str())
    }
}

/// Rules list kept in memory; `redraw` only counts calls.
#[derive(Debug, Default)]
pub struct InMemoryRulesCollection {
    rules: Mutex<Vec<MonitoringRule>>,
    redraws: AtomicUsize,
}

impl InMemoryRulesCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> Vec<MonitoringRule> {
        self.rules.lock().clone()
    }

    pub fn redraw_count(&self) -> usize {
        self.redraws.load(Ordering::SeqCst)
    }
}

impl RulesCollection for InMemoryRulesCollection {
    fn append(&self, rule: MonitoringRule) {
        self.rules.lock().push(rule);
    }

    fn reattach(&self, rule_id: &RuleId, machine: MachineKey) -> bool {
        let mut rules = self.rules.lock();
        match rules.iter_mut().find(|r| &r.id == rule_id) {
            Some(rule) => {
                rule.target = RuleTarget::Resolved(machine);
                true
            }
            None => false,
        }
    }

    fn redraw(&self) {
        let count = self.redraws.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(redraws = count, "Rules redraw requested");
    }
}

/// Fixed authentication state, toggled by the host.
#[derive(Debug)]
pub struct StaticSession {
    authenticated: AtomicBool,
}

impl StaticSession {
    pub fn new(authenticated: bool) -> Self {
        Self {
            authenticated: AtomicBool::new(authenticated),
        }
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }
}

impl Session for StaticSession {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::monitoring::RuleDescriptor;

    fn rule(id: &str) -> MonitoringRule {
        let descriptor = RuleDescriptor {
            value: 90.0,
            metric: "cpu".into(),
            command: None,
            max_value: None,
            action: "alert".into(),
            operator: "gt".into(),
            backend: "b1".into(),
            machine: "m1".into(),
        };
        MonitoringRule::from_descriptor(id.into(), descriptor, None, None)
    }

    #[test]
    fn test_default_operators() {
        let registry = StaticOperatorRegistry::default();
        assert_eq!(registry.operator_by_title("gt").unwrap().symbol, ">");
        assert_eq!(registry.operator_by_title("lt").unwrap().symbol, "<");
        assert!(registry.operator_by_title("eq").is_none());
    }

    #[test]
    fn test_provider_titles() {
        let catalog = StaticProviderCatalog::new(vec![
            Provider::new("rackspace", "Rackspace DFW"),
            Provider::new("linode", "Linode"),
        ]);
        assert_eq!(catalog.title_for("linode"), Some("Linode"));
        assert_eq!(catalog.title_for("nephoscale"), None);
        assert_eq!(catalog.providers()[0].provider, "rackspace");
        assert!(StaticProviderCatalog::default().providers().is_empty());
    }

    #[test]
    fn test_rules_collection_reattach() {
        let rules = InMemoryRulesCollection::new();
        rules.append(rule("r1"));

        assert!(rules.reattach(&"r1".into(), MachineKey::new("b1", "m1")));
        assert!(!rules.reattach(&"r2".into(), MachineKey::new("b1", "m1")));
        assert!(rules.rules()[0].target.is_resolved());
    }

    #[test]
    fn test_session_toggle() {
        let session = StaticSession::new(false);
        assert!(!session.is_authenticated());
        session.set_authenticated(true);
        assert!(session.is_authenticated());
    }
}
