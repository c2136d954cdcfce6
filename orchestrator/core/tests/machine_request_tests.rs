// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

use mist_core::application::machine_request::{LookupError, MachineRequestSlot};
use mist_core::domain::backend::{Backend, BackendDescriptor, BackendId, Collection, MachineDescriptor, MachineId};
use mist_core::infrastructure::registry_store::RegistryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn machine(id: &str) -> MachineDescriptor {
    MachineDescriptor { id: id.into(), name: Some(format!("{}-name", id)), state: None }
}

fn backend_with(id: &str, machines: Vec<MachineDescriptor>) -> Backend {
    let mut descriptor = BackendDescriptor::new(id);
    descriptor.machines = Some(machines);
    descriptor.images = Some(vec![]);
    Backend::from_descriptor(descriptor, true)
}

/// A store whose backend list is loaded but whose only backend is still
/// loading machines.
fn loading_store() -> (Arc<RegistryStore>, BackendId) {
    let store = Arc::new(RegistryStore::default());
    let id = store.add_backend(Backend::from_descriptor(BackendDescriptor::new("b1"), true));
    store.set_loading_backends(false);
    (store, id)
}

#[tokio::test]
async fn test_request_deferred_until_machines_settle() {
    let (store, b1) = loading_store();
    let slot = Arc::new(MachineRequestSlot::new(store.clone(), Duration::from_secs(120)));

    let handle = slot.request("m1".into());
    tokio::task::yield_now().await;

    assert!(slot.response().is_none());
    assert_eq!(slot.pending(), Some(MachineId::from("m1")));

    // Machines arrive but the flag is still up
    store.replace_machines(&b1, vec![machine("m1")]).unwrap();
    tokio::task::yield_now().await;
    assert!(slot.response().is_none());

    store.set_loading(&b1, Collection::Machines, false).unwrap();
    handle.await.unwrap();

    let response = slot.response().unwrap();
    assert_eq!(response.machine_id, MachineId::from("m1"));
    assert_eq!(response.machine, store.find_machine_any_backend(&"m1".into()));
    assert!(response.machine.is_some());
    assert!(slot.pending().is_none());
}

#[tokio::test]
async fn test_request_deferred_while_backends_loading() {
    let store = Arc::new(RegistryStore::default());
    store.add_backend(backend_with("b1", vec![machine("m1")]));
    let slot = Arc::new(MachineRequestSlot::new(store.clone(), Duration::from_secs(120)));

    let handle = slot.request("m1".into());
    tokio::task::yield_now().await;
    assert!(slot.response().is_none());

    store.set_loading_backends(false);
    handle.await.unwrap();

    assert!(slot.response().unwrap().machine.is_some());
}

#[tokio::test]
async fn test_settled_store_answers_immediately() {
    let store = Arc::new(RegistryStore::default());
    store.add_backend(backend_with("b1", vec![machine("m1")]));
    store.add_backend(backend_with("b2", vec![machine("m1"), machine("m2")]));
    store.set_loading_backends(false);
    let slot = MachineRequestSlot::new(store.clone(), Duration::from_secs(1));

    // Ambiguous ids resolve to the first backend in order
    let found = slot.resolve(&"m1".into()).await.unwrap().unwrap();
    assert_eq!(found.backend_id, BackendId::from("b1"));

    assert!(slot.resolve(&"missing".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_machine_yields_empty_response() {
    let store = Arc::new(RegistryStore::default());
    store.add_backend(backend_with("b1", vec![machine("m1")]));
    store.set_loading_backends(false);
    let slot = Arc::new(MachineRequestSlot::new(store, Duration::from_secs(1)));

    slot.request("m404".into()).await.unwrap();

    let response = slot.response().unwrap();
    assert_eq!(response.machine_id, MachineId::from("m404"));
    assert!(response.machine.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_request_times_out_and_clears() {
    let (store, _) = loading_store();
    let slot = Arc::new(MachineRequestSlot::new(store, Duration::from_secs(10)));

    let started = tokio::time::Instant::now();
    slot.request("m1".into()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(10));
    assert!(slot.response().is_none());
    assert!(slot.pending().is_none());

    assert_eq!(
        slot.resolve(&"m1".into()).await,
        Err(LookupError::Timeout(Duration::from_secs(10)))
    );
}

#[tokio::test]
async fn test_new_request_supersedes_pending_one() {
    let (store, b1) = loading_store();
    let slot = Arc::new(MachineRequestSlot::new(store.clone(), Duration::from_secs(120)));

    let first = slot.request("m1".into());
    let second = slot.request("m2".into());
    first.await.unwrap();
    assert_eq!(slot.pending(), Some(MachineId::from("m2")));

    store.replace_machines(&b1, vec![machine("m1"), machine("m2")]).unwrap();
    store.set_loading(&b1, Collection::Machines, false).unwrap();
    second.await.unwrap();

    let response = slot.response().unwrap();
    assert_eq!(response.machine_id, MachineId::from("m2"));
}

#[tokio::test]
async fn test_shutdown_cancels_request() {
    let (store, _) = loading_store();
    let token = CancellationToken::new();
    let slot = Arc::new(
        MachineRequestSlot::new(store, Duration::from_secs(120)).with_shutdown_token(token.clone()),
    );

    let handle = slot.request("m1".into());
    token.cancel();
    handle.await.unwrap();

    assert!(slot.response().is_none());
    assert_eq!(slot.resolve(&"m1".into()).await, Err(LookupError::Cancelled));
}
