// Copyright (c) 2026 Mist.io contributors
// SPDX-License-Identifier: AGPL-3.0

// Sync Configuration Types
//
// Defines the configuration schema for a registry sync client, including:
// - Server endpoint and API key
// - Backend list retry policy and content loading
// - Monitoring warm-up, interval, retry and unresolved-rule policies
// - Deferred machine lookup bound

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::backend::Provider;
use crate::domain::policy::{RetryPolicy, UnresolvedRulePolicy};

/// Top-level configuration file (`mist-config.yaml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub backends: BackendsConfig,

    #[serde(default)]
    pub monitoring: MonitoringConfig,

    #[serde(default)]
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL the endpoint paths are appended to
    pub base_url: String,

    /// Optional bearer key sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:6543".to_string(),
            api_key: None,
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Monitoring sync is skipped for unauthenticated sessions
    #[serde(default = "default_true")]
    pub authenticated: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { authenticated: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    #[serde(default = "default_backend_retry")]
    pub retry: RetryPolicy,

    /// Fetch machines and images for every backend after the list loads
    #[serde(default = "default_true")]
    pub load_contents: bool,

    /// Provider kinds offered to users, in display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<Provider>,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            retry: default_backend_retry(),
            load_contents: true,
            providers: Vec::new(),
        }
    }
}

fn default_backend_retry() -> RetryPolicy {
    RetryPolicy::Indefinite {
        delay: Duration::from_secs(5),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Delay between readiness and the first monitoring fetch
    #[serde(default = "default_warmup", with = "humantime_serde")]
    pub warmup: Duration,

    /// Repeat the sync at this interval; unset means run once
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,

    #[serde(default = "default_monitoring_retry")]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub unresolved_rules: UnresolvedRulePolicy,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            warmup: default_warmup(),
            interval: None,
            retry: default_monitoring_retry(),
            unresolved_rules: UnresolvedRulePolicy::default(),
        }
    }
}

fn default_warmup() -> Duration {
    Duration::from_secs(5)
}

fn default_monitoring_retry() -> RetryPolicy {
    RetryPolicy::Never
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Longest a deferred machine request waits for the registry to settle
    #[serde(default = "default_settle_timeout", with = "humantime_serde")]
    pub settle_timeout: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            settle_timeout: default_settle_timeout(),
        }
    }
}

fn default_settle_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_true() -> bool {
    true
}

impl SyncConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. MIST_CONFIG_PATH environment variable
    /// 2. ./mist-config.yaml (working directory)
    /// 3. ~/.mist/config.yaml (user home)
    /// 4. /etc/mist/config.yaml (system, Unix) or C:\ProgramData\Mist\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("MIST_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./mist-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".mist").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/mist/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Mist\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load from an explicit path, else from discovery, else defaults.
    /// Environment overrides are applied in every case.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path (fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("MIST_SERVER_URL") {
            tracing::info!("Environment override: MIST_SERVER_URL={}", url);
            self.server.base_url = url;
        }

        if let Ok(key) = std::env::var("MIST_API_KEY") {
            tracing::info!("Environment override: MIST_API_KEY=<redacted>");
            self.server.api_key = Some(key);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let base_url = self.server.base_url.trim();
        if base_url.is_empty() {
            anyhow::bail!("server.base_url cannot be empty");
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            anyhow::bail!(
                "server.base_url must start with http:// or https://, got '{}'",
                base_url
            );
        }

        if self.server.request_timeout.is_zero() {
            anyhow::bail!("server.request_timeout must be greater than zero");
        }

        for (name, policy) in [
            ("backends.retry", &self.backends.retry),
            ("monitoring.retry", &self.monitoring.retry),
        ] {
            if policy.delay().is_some_and(|d| d.is_zero()) {
                anyhow::bail!("{} delay must be greater than zero", name);
            }
        }

        for (i, entry) in self.backends.providers.iter().enumerate() {
            if entry.provider.trim().is_empty() {
                anyhow::bail!("backends.providers[{}].provider cannot be empty", i);
            }
            if self.backends.providers[..i]
                .iter()
                .any(|earlier| earlier.provider == entry.provider)
            {
                anyhow::bail!("backends.providers lists '{}' twice", entry.provider);
            }
        }

        if self.monitoring.interval.is_some_and(|d| d.is_zero()) {
            anyhow::bail!("monitoring.interval must be greater than zero when set");
        }

        if self.lookup.settle_timeout.is_zero() {
            anyhow::bail!("lookup.settle_timeout must be greater than zero");
        }

        Ok(())
    }
}
