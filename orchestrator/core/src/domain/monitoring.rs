// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Monitoring Domain
//!
//! Types for the `GET /monitoring` payload and the rules merged from it.
//!
//! A [`MonitoringRule`] targets one machine through a composite key. When the
//! machine is not in the registry at merge time the rule keeps the raw ids in
//! [`RuleTarget::Unresolved`] instead of failing.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::domain::backend::{BackendId, MachineId, MachineKey};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Comparison operator a rule applies to its metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// Name used on the wire (e.g. "gt")
    pub title: String,
    /// Symbol shown to users (e.g. ">")
    pub symbol: String,
}

impl Operator {
    pub fn new(title: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            symbol: symbol.into(),
        }
    }
}

// ============================================================================
// Wire payload
// ============================================================================

/// Rule fields as sent by the server, keyed by rule id in the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    #[serde(default)]
    pub value: f64,
    pub metric: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub max_value: Option<f64>,
    pub action: String,
    pub operator: String,
    pub backend: BackendId,
    pub machine: MachineId,
}

/// Rules of a monitoring payload, in the order the server listed them.
///
/// The wire form is a JSON object keyed by rule id. A repeated key replaces
/// the earlier rule in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleSet(Vec<(RuleId, RuleDescriptor)>);

impl RuleSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &RuleId) -> Option<&RuleDescriptor> {
        self.0.iter().find(|entry| &entry.0 == id).map(|entry| &entry.1)
    }

    pub fn ids(&self) -> impl Iterator<Item = &RuleId> {
        self.0.iter().map(|entry| &entry.0)
    }

    fn insert(&mut self, id: RuleId, rule: RuleDescriptor) {
        match self.0.iter_mut().find(|entry| entry.0 == id) {
            Some(entry) => entry.1 = rule,
            None => self.0.push((id, rule)),
        }
    }
}

impl FromIterator<(RuleId, RuleDescriptor)> for RuleSet {
    fn from_iter<I: IntoIterator<Item = (RuleId, RuleDescriptor)>>(iter: I) -> Self {
        let mut rules = RuleSet::default();
        for (id, rule) in iter {
            rules.insert(id, rule);
        }
        rules
    }
}

impl IntoIterator for RuleSet {
    type Item = (RuleId, RuleDescriptor);
    type IntoIter = std::vec::IntoIter<(RuleId, RuleDescriptor)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, rule) in &self.0 {
            map.serialize_entry(id, rule)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleSetVisitor;

        impl<'de> Visitor<'de> for RuleSetVisitor {
            type Value = RuleSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of rule ids to rules")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RuleSet, A::Error> {
                let mut rules = RuleSet(Vec::with_capacity(access.size_hint().unwrap_or(0)));
                while let Some((id, rule)) = access.next_entry::<RuleId, RuleDescriptor>()? {
                    rules.insert(id, rule);
                }
                Ok(rules)
            }
        }

        deserializer.deserialize_map(RuleSetVisitor)
    }
}

/// Body of `GET /monitoring`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitoringPayload {
    #[serde(default)]
    pub auth_key: Option<String>,
    /// Monitored machines as `[backend_id, machine_id]` pairs
    #[serde(default)]
    pub machines: Vec<(BackendId, MachineId)>,
    #[serde(default)]
    pub current_plan: serde_json::Value,
    #[serde(default)]
    pub user_details: serde_json::Value,
    #[serde(default)]
    pub rules: RuleSet,
}

/// Account-level data carried by the monitoring payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringAccount {
    pub auth_key: Option<String>,
    pub monitored_machines: Vec<MachineKey>,
    pub current_plan: serde_json::Value,
    pub user_details: serde_json::Value,
}

impl MonitoringAccount {
    pub fn from_payload(payload: &MonitoringPayload) -> Self {
        Self {
            auth_key: payload.auth_key.clone(),
            monitored_machines: payload
                .machines
                .iter()
                .map(|(b, m)| MachineKey::new(b.clone(), m.clone()))
                .collect(),
            current_plan: payload.current_plan.clone(),
            user_details: payload.user_details.clone(),
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleTarget {
    /// The machine was present in the registry when the rule was merged
    Resolved(MachineKey),
    /// Raw ids kept because the machine could not be found
    Unresolved {
        backend_id: BackendId,
        machine_id: MachineId,
    },
}

impl RuleTarget {
    pub fn is_resolved(&self) -> bool {
        matches!(self, RuleTarget::Resolved(_))
    }

    pub fn backend_id(&self) -> &BackendId {
        match self {
            RuleTarget::Resolved(key) => &key.backend_id,
            RuleTarget::Unresolved { backend_id, .. } => backend_id,
        }
    }

    pub fn machine_id(&self) -> &MachineId {
        match self {
            RuleTarget::Resolved(key) => &key.machine_id,
            RuleTarget::Unresolved { machine_id, .. } => machine_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringRule {
    pub id: RuleId,
    pub value: f64,
    pub metric: String,
    pub command: Option<String>,
    pub max_value: Option<f64>,
    pub action: String,
    /// `None` when the operator name is unknown to the operator registry
    pub operator: Option<Operator>,
    pub target: RuleTarget,
}

impl MonitoringRule {
    pub fn from_descriptor(
        id: RuleId,
        descriptor: RuleDescriptor,
        operator: Option<Operator>,
        resolved: Option<MachineKey>,
    ) -> Self {
        let target = match resolved {
            Some(key) => RuleTarget::Resolved(key),
            None => RuleTarget::Unresolved {
                backend_id: descriptor.backend,
                machine_id: descriptor.machine,
            },
        };

        Self {
            id,
            value: descriptor.value,
            metric: descriptor.metric,
            command: descriptor.command,
            max_value: descriptor.max_value,
            action: descriptor.action,
            operator,
            target,
        }
    }
}
