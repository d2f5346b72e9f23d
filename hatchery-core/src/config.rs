//! Hatchery configuration

use hatchery_client::{BackendConfig, DeadlineBackend, FarmBackend, HttpBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cascade::CascadePolicy;
use crate::error::{HatcheryError, Result};
use crate::poller::PollerConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HatcheryConfig {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub allocation: AllocationSection,
    #[serde(default)]
    pub polling: PollingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSection {
    /// API root, e.g. `https://farm.example.com/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP client timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Per-call deadline in milliseconds (0 = none)
    #[serde(default)]
    pub operation_timeout_ms: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            operation_timeout_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationSection {
    #[serde(default)]
    pub cascade_policy: CascadePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingSection {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

// Defaults
fn default_base_url() -> String { "http://localhost:5000/api".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_interval_secs() -> u64 { 30 }
fn default_max_backoff_secs() -> u64 { 300 }

impl HatcheryConfig {
    /// Read `path` if it exists, otherwise use defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| HatcheryError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| HatcheryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(HatcheryError::Config(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                self.backend.base_url
            )));
        }
        if self.polling.interval_secs == 0 {
            return Err(HatcheryError::Config(
                "polling.interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.backend.base_url.trim().to_string(),
            api_key: self.backend.api_key.clone().filter(|k| !k.is_empty()),
            timeout_secs: self.backend.timeout_secs,
        }
    }

    /// HTTP backend, wrapped in a per-call deadline when one is configured.
    pub fn build_backend(&self) -> Result<Arc<dyn FarmBackend>> {
        self.validate()?;
        let http: Arc<dyn FarmBackend> = Arc::new(HttpBackend::new(self.backend_config())?);
        match self.backend.operation_timeout_ms {
            0 => Ok(http),
            ms => Ok(Arc::new(DeadlineBackend::new(http, Duration::from_millis(ms)))),
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(self.polling.interval_secs),
            max_backoff: Duration::from_secs(self.polling.max_backoff_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = HatcheryConfig::from_toml_str("").unwrap();
        assert_eq!(config, HatcheryConfig::default());
        assert_eq!(config.allocation.cascade_policy, CascadePolicy::AbortAndReport);
        assert_eq!(config.poller_config().interval, Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = HatcheryConfig::from_toml_str("[backend]\nbase_url = \"ftp://farm\"\n").unwrap_err();
        assert!(matches!(err, HatcheryError::Config(_)));
    }

    #[test]
    fn test_empty_api_key_is_none() {
        let mut config = HatcheryConfig::default();
        config.backend.api_key = Some(String::new());
        assert_eq!(config.backend_config().api_key, None);
    }
}
