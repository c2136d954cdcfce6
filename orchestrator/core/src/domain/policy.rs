// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! Per-endpoint sync policies.
//!
//! The backend list and the monitoring endpoint deliberately use different
//! retry behaviour. Both are expressed here as named configuration instead of
//! being hard-coded in the services.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Report the failure and stop
    Never,
    /// Retry forever with a fixed delay
    Indefinite {
        #[serde(with = "humantime_serde")]
        delay: Duration,
    },
    /// Retry with a fixed delay until `max_attempts` fetches have failed
    Bounded {
        #[serde(with = "humantime_serde")]
        delay: Duration,
        max_attempts: u32,
    },
}

impl RetryPolicy {
    /// Delay before the next attempt, given how many attempts have failed so
    /// far. `None` means give up.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        match *self {
            RetryPolicy::Never => None,
            RetryPolicy::Indefinite { delay } => Some(delay),
            RetryPolicy::Bounded { delay, max_attempts } => {
                (failures < max_attempts).then_some(delay)
            }
        }
    }

    pub fn delay(&self) -> Option<Duration> {
        match *self {
            RetryPolicy::Never => None,
            RetryPolicy::Indefinite { delay } | RetryPolicy::Bounded { delay, .. } => Some(delay),
        }
    }
}

/// How a rule whose target machine was missing at merge time is treated on
/// later monitoring syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedRulePolicy {
    /// Keep the raw ids for the lifetime of the engine
    #[default]
    Degrade,
    /// Try to resolve the target again on every later sync
    RetryOnNextSync,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_gives_up_immediately() {
        assert_eq!(RetryPolicy::Never.next_delay(1), None);
    }

    #[test]
    fn test_indefinite_always_retries() {
        let policy = RetryPolicy::Indefinite { delay: Duration::from_secs(5) };
        assert_eq!(policy.next_delay(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_delay(10_000), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_bounded_stops_after_max_attempts() {
        let policy = RetryPolicy::Bounded { delay: Duration::from_secs(1), max_attempts: 3 };
        assert!(policy.next_delay(2).is_some());
        assert!(policy.next_delay(3).is_none());
    }

    #[test]
    fn test_policy_yaml_shape() {
        let policy: RetryPolicy = serde_yaml::from_str("kind: indefinite\ndelay: 5s\n").unwrap();
        assert_eq!(policy, RetryPolicy::Indefinite { delay: Duration::from_secs(5) });

        let policy: UnresolvedRulePolicy = serde_yaml::from_str("retry_on_next_sync").unwrap();
        assert_eq!(policy, UnresolvedRulePolicy::RetryOnNextSync);
    }
}
