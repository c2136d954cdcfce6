// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

use mist_core::domain::backend::{BackendId, MachineId};
use mist_core::domain::config::ServerConfig;
use mist_core::domain::monitoring::RuleId;
use mist_core::domain::remote::{RegistryRemote, RemoteError};
use mist_core::infrastructure::http_remote::HttpRegistryRemote;
use std::time::Duration;

fn remote_for(url: String, api_key: Option<&str>) -> HttpRegistryRemote {
    HttpRegistryRemote::new(&ServerConfig {
        base_url: url,
        api_key: api_key.map(str::to_string),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_backends_sends_key_and_parses_listing() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/backends")
        .match_header("authorization", "Bearer secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": "b1", "provider": "ec2_ap_northeast", "title": "EC2 Tokyo"}, {"id": "b2"}]"#)
        .create_async()
        .await;

    let remote = remote_for(server.url(), Some("secret"));
    let backends = remote.fetch_backends().await.unwrap();

    mock.assert_async().await;
    assert_eq!(backends.len(), 2);
    assert_eq!(backends[0].title.as_deref(), Some("EC2 Tokyo"));
    assert_eq!(backends[1].id, BackendId::from("b2"));
    assert!(backends[1].provider.is_empty());
    assert!(backends[1].machines.is_none());
}

#[tokio::test]
async fn test_trailing_slash_in_base_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/backends/b1/machines")
        .with_status(200)
        .with_body(r#"[{"id": "m1", "name": "web-1", "state": "running"}]"#)
        .create_async()
        .await;

    let remote = remote_for(format!("{}/", server.url()), None);
    let machines = remote.fetch_machines(&"b1".into()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(machines[0].id, MachineId::from("m1"));
    assert_eq!(machines[0].state.as_deref(), Some("running"));
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/backends")
        .with_status(503)
        .create_async()
        .await;

    let remote = remote_for(server.url(), None);
    let err = remote.fetch_backends().await.unwrap_err();

    assert_eq!(
        err,
        RemoteError::Status { endpoint: "/backends".to_string(), status: 503 }
    );
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/backends/b1/images")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let remote = remote_for(server.url(), None);
    let err = remote.fetch_images(&"b1".into()).await.unwrap_err();

    assert!(matches!(err, RemoteError::Decode { ref endpoint, .. } if endpoint == "/backends/b1/images"));
}

#[tokio::test]
async fn test_fetch_monitoring_payload() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/monitoring")
        .with_status(200)
        .with_body(
            r#"{
                "auth_key": "abc",
                "machines": [["b1", "m1"]],
                "current_plan": {"title": "Startup", "machine_limit": 5},
                "user_details": {"name": "ops"},
                "rules": {
                    "rule-1": {"value": 70, "metric": "cpu", "command": null, "max_value": 100,
                               "action": "alert", "operator": "gt", "backend": "b1", "machine": "m1"}
                }
            }"#,
        )
        .create_async()
        .await;

    let remote = remote_for(server.url(), None);
    let payload = remote.fetch_monitoring().await.unwrap();

    assert_eq!(payload.auth_key.as_deref(), Some("abc"));
    assert_eq!(payload.machines, vec![(BackendId::from("b1"), MachineId::from("m1"))]);
    assert_eq!(payload.current_plan["machine_limit"], 5);
    assert_eq!(payload.rules.get(&RuleId::from("rule-1")).unwrap().value, 70.0);
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    // Nothing listens on the discard port
    let remote = remote_for("http://127.0.0.1:9".to_string(), None);
    let err = remote.fetch_backends().await.unwrap_err();

    assert!(matches!(err, RemoteError::Transport(_)));
}
