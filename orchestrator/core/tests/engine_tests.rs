// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use mist_core::application::backend_loader::LoaderState;
use mist_core::application::engine::{Collaborators, SyncEngine};
use mist_core::domain::backend::{BackendDescriptor, BackendId, ImageDescriptor, MachineDescriptor, MachineId, Provider};
use mist_core::domain::config::SyncConfig;
use mist_core::domain::monitoring::MonitoringPayload;
use mist_core::domain::remote::{RegistryRemote, RemoteError};
use mist_core::infrastructure::collaborators::{
    InMemoryRulesCollection, StaticOperatorRegistry, StaticSession, TracingNotificationSink,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One backend with one machine, monitored, with one rule on it.
#[derive(Default)]
struct FixedRemote {
    backend_calls: AtomicUsize,
}

#[async_trait]
impl RegistryRemote for FixedRemote {
    async fn fetch_backends(&self) -> Result<Vec<BackendDescriptor>, RemoteError> {
        self.backend_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![BackendDescriptor::new("b1")])
    }

    async fn fetch_machines(&self, _backend_id: &BackendId) -> Result<Vec<MachineDescriptor>, RemoteError> {
        // Machines land a second after the list, well inside the monitoring warm-up
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(vec![MachineDescriptor { id: "m1".into(), name: None, state: None }])
    }

    async fn fetch_images(&self, _backend_id: &BackendId) -> Result<Vec<ImageDescriptor>, RemoteError> {
        Ok(vec![])
    }

    async fn fetch_monitoring(&self) -> Result<MonitoringPayload, RemoteError> {
        Ok(serde_json::from_value(serde_json::json!({
            "machines": [["b1", "m1"]],
            "rules": {
                "r1": {"value": 90, "metric": "cpu", "action": "alert",
                       "operator": "gt", "backend": "b1", "machine": "m1"}
            }
        }))
        .unwrap())
    }
}

fn engine(config: &SyncConfig) -> (SyncEngine, Arc<InMemoryRulesCollection>) {
    engine_with_remote(config, Arc::new(FixedRemote::default()))
}

fn engine_with_remote(config: &SyncConfig, remote: Arc<FixedRemote>) -> (SyncEngine, Arc<InMemoryRulesCollection>) {
    let rules = Arc::new(InMemoryRulesCollection::new());
    let collaborators = Collaborators {
        remote,
        notifier: Arc::new(TracingNotificationSink),
        operators: Arc::new(StaticOperatorRegistry::default()),
        rules: rules.clone(),
        session: Arc::new(StaticSession::new(true)),
    };
    (SyncEngine::new(config, collaborators), rules)
}

#[tokio::test(start_paused = true)]
async fn test_engine_waits_for_readiness_then_syncs() {
    let (engine, rules) = engine(&SyncConfig::default());
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();

    engine.start(async move {
        let _ = ready_rx.await;
    });

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(engine.loader().state(), LoaderState::Idle);
    assert!(engine.summary().loading_backends);

    ready_tx.send(()).unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;

    let summary = engine.summary();
    assert!(!summary.loading_backends);
    assert_eq!(summary.machine_count, 1);
    assert_eq!(engine.loader().state(), LoaderState::Populated);

    let machine = engine.store().find_machine(&"b1".into(), &"m1".into()).unwrap();
    assert!(machine.has_monitoring);
    assert_eq!(rules.rules().len(), 1);
    assert!(rules.rules()[0].target.is_resolved());
    assert!(engine.monitoring().account().is_some());

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_deferred_request_through_engine() {
    let (engine, _) = engine(&SyncConfig::default());
    let handle = engine.machine_request().request("m1".into());

    engine.start(async {});
    handle.await.unwrap();

    let response = engine.machine_request().response().unwrap();
    assert_eq!(response.machine.unwrap().backend_id, BackendId::from("b1"));
    assert_eq!(response.machine_id, MachineId::from("m1"));

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_ready() {
    let mut config = SyncConfig::default();
    config.monitoring.enabled = false;
    let (engine, rules) = engine(&config);

    engine.start(std::future::pending());
    engine.shutdown().await;

    assert_eq!(engine.loader().state(), LoaderState::Idle);
    assert_eq!(rules.redraw_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_summary_watch_reports_settled_registry() {
    let mut config = SyncConfig::default();
    config.monitoring.enabled = false;
    let (engine, _) = engine(&config);
    let mut summary = engine.subscribe_summary();

    engine.start(async {});
    summary.wait_for(|s| s.machines_settled() && s.machine_count == 1).await.unwrap();

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_ignored() {
    let mut config = SyncConfig::default();
    config.monitoring.enabled = false;
    let remote = Arc::new(FixedRemote::default());
    let (engine, _) = engine_with_remote(&config, remote.clone());

    assert!(engine.start(async {}));
    assert!(!engine.start(async {}));

    let mut finished = engine.loader().subscribe_finished();
    finished.wait_for(Option::is_some).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(remote.backend_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.store().backends().len(), 1);

    engine.shutdown().await;
}

#[test]
fn test_providers_come_from_config() {
    let mut config = SyncConfig::default();
    config.backends.providers = vec![Provider::new("ec2_ap_northeast", "EC2 AP NORTHEAST")];
    let (engine, _) = engine(&config);

    assert_eq!(engine.providers().title_for("ec2_ap_northeast"), Some("EC2 AP NORTHEAST"));
    assert_eq!(engine.providers().providers().len(), 1);
}
