// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

//! HTTP Registry Remote
//!
//! `reqwest` implementation of [`RegistryRemote`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Fetch backend, content and monitoring JSON from the server
//! - **Integration:** Mist HTTP API → descriptors → application services
//!
//! # Usage
//!
//! ```ignore
//! let remote = HttpRegistryRemote::new(&config.server)?;
//! let backends = remote.fetch_backends().await?;
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::backend::{BackendDescriptor, BackendId, ImageDescriptor, MachineDescriptor};
use crate::domain::config::ServerConfig;
use crate::domain::monitoring::MonitoringPayload;
use crate::domain::remote::{RegistryRemote, RemoteError};

pub struct HttpRegistryRemote {
    /// Base URL, without trailing slash
    base_url: String,

    client: Client,

    /// Optional bearer key
    api_key: Option<String>,
}

impl HttpRegistryRemote {
    pub fn new(config: &ServerConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("mist-registry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Fetching");

        let mut req = self.client.get(&url).header("Accept", "application/json");

        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = req
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| RemoteError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl RegistryRemote for HttpRegistryRemote {
    async fn fetch_backends(&self) -> Result<Vec<BackendDescriptor>, RemoteError> {
        self.get_json("/backends").await
    }

    async fn fetch_machines(&self, backend_id: &BackendId) -> Result<Vec<MachineDescriptor>, RemoteError> {
        self.get_json(&format!("/backends/{}/machines", backend_id)).await
    }

    async fn fetch_images(&self, backend_id: &BackendId) -> Result<Vec<ImageDescriptor>, RemoteError> {
        self.get_json(&format!("/backends/{}/images", backend_id)).await
    }

    async fn fetch_monitoring(&self) -> Result<MonitoringPayload, RemoteError> {
        self.get_json("/monitoring").await
    }
}
