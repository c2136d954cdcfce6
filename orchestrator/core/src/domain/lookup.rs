// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0
//! Lookup index over the ordered backend list.
//!
//! All queries are linear scans that stop at the first hit. None of them fail
//! on a miss; callers get `None`.

use crate::domain::backend::{Backend, BackendId, Machine, MachineId};

/// First backend whose id equals `backend_id`.
pub fn find_backend<'a>(backends: &'a [Backend], backend_id: &BackendId) -> Option<&'a Backend> {
    backends.iter().find(|b| &b.id == backend_id)
}

/// Machine addressed by its composite key.
///
/// Only the first backend matching `backend_id` is searched. A machine with
/// the same id under another backend is never returned.
pub fn find_machine<'a>(
    backends: &'a [Backend],
    backend_id: &BackendId,
    machine_id: &MachineId,
) -> Option<&'a Machine> {
    find_backend(backends, backend_id).and_then(|b| b.machine(machine_id))
}

/// First machine with `machine_id` in backend-then-machine order.
///
/// Machine ids are only unique per backend, so this is best effort: when the
/// same id exists under several backends the earliest backend wins.
pub fn find_machine_any_backend<'a>(
    backends: &'a [Backend],
    machine_id: &MachineId,
) -> Option<&'a Machine> {
    backends.iter().find_map(|b| b.machine(machine_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backend::{BackendDescriptor, MachineDescriptor};

    fn backend(id: &str, machines: &[&str]) -> Backend {
        let mut descriptor = BackendDescriptor::new(id);
        descriptor.machines = Some(
            machines
                .iter()
                .map(|m| MachineDescriptor { id: (*m).into(), name: None, state: None })
                .collect(),
        );
        Backend::from_descriptor(descriptor, false)
    }

    #[test]
    fn test_find_machine_requires_matching_backend() {
        let backends = vec![backend("b1", &["m1"]), backend("b2", &["m2"])];

        assert!(find_machine(&backends, &"b1".into(), &"m1".into()).is_some());
        assert!(find_machine(&backends, &"b3".into(), &"m1".into()).is_none());
        assert!(find_machine(&backends, &"b1".into(), &"m2".into()).is_none());
    }

    #[test]
    fn test_find_machine_stops_at_first_matching_backend() {
        // Duplicate backend ids: only the first entry is consulted.
        let backends = vec![backend("b1", &[]), backend("b1", &["m1"])];
        assert!(find_machine(&backends, &"b1".into(), &"m1".into()).is_none());
    }

    #[test]
    fn test_any_backend_prefers_earliest_backend() {
        let backends = vec![backend("b1", &["shared"]), backend("b2", &["shared", "m9"])];

        let found = find_machine_any_backend(&backends, &"shared".into()).unwrap();
        assert_eq!(found.backend_id, BackendId::from("b1"));

        let found = find_machine_any_backend(&backends, &"m9".into()).unwrap();
        assert_eq!(found.backend_id, BackendId::from("b2"));
    }

    #[test]
    fn test_any_backend_is_idempotent() {
        let backends = vec![backend("b1", &["x"]), backend("b2", &["x"])];
        let first = find_machine_any_backend(&backends, &"x".into()).cloned();
        let second = find_machine_any_backend(&backends, &"x".into()).cloned();
        assert_eq!(first, second);
    }

    #[test]
    fn test_find_backend_miss_returns_none() {
        assert!(find_backend(&[], &"nope".into()).is_none());
    }
}
