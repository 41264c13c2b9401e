//! 运行配置：YAML 设置文件、环境变量覆盖与凭证查找。
//!
//! Runtime settings.
//!
//! Settings come from a YAML file (or the built-in defaults) and are then
//! overridden by `ADS_*` environment variables. Credentials never live in the
//! settings file; [`lookup_access_token`] reads them from the OS keyring or
//! the environment.

use crate::adapter::{AdapterConfig, PlatformAdapter};
use crate::backoff::RetryConfig;
use crate::{Error, ErrorContext, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::Arc;

/// Keyring service under which per-platform access tokens are stored.
pub const KEYRING_SERVICE: &str = "ads-lib";

/// HTTP client settings shared by every platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
    pub proxy_url: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            pool_max_idle_per_host: 32,
            pool_idle_timeout_secs: 90,
            proxy_url: None,
        }
    }
}

impl HttpSettings {
    /// Apply `ADS_HTTP_TIMEOUT_SECS`, `ADS_HTTP_POOL_MAX_IDLE_PER_HOST` and
    /// `ADS_PROXY_URL` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(secs) = lookup("ADS_HTTP_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            self.timeout_secs = secs;
        }
        if let Some(n) = lookup("ADS_HTTP_POOL_MAX_IDLE_PER_HOST").and_then(|s| s.parse::<usize>().ok()) {
            self.pool_max_idle_per_host = n;
        }
        if let Some(proxy) = lookup("ADS_PROXY_URL").filter(|s| !s.trim().is_empty()) {
            self.proxy_url = Some(proxy);
        }
        self
    }
}

/// Per-platform overrides. Anything left unset falls back to the global
/// settings or the adapter's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    pub base_url: Option<String>,
    pub retry: Option<RetryConfig>,
    pub max_auth_refreshes: Option<u32>,
    /// API version segment or header value (e.g. `v19.0`, `202401`).
    pub api_version: Option<String>,
    /// Meta app secret used for `appsecret_proof`.
    pub app_secret: Option<String>,
    /// Google Ads developer token.
    pub developer_token: Option<String>,
    /// Google Ads manager account id.
    pub login_customer_id: Option<String>,
}

/// Top-level settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub retry: RetryConfig,
    pub platforms: HashMap<String, PlatformSettings>,
}

impl Settings {
    /// Parse YAML, apply environment overrides and validate.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid settings document: {}", e),
                ErrorContext::new().with_source("settings"),
            )
        })?;
        let settings = settings.with_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("failed to read settings file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("settings"),
            )
        })?;
        Self::from_yaml_str(&content)
    }

    /// Defaults plus environment overrides, for callers without a file.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        self.http = self.http.with_overrides_from(&lookup);
        if let Some(n) = lookup("ADS_MAX_RETRIES").and_then(|s| s.parse::<u32>().ok()) {
            self.retry.max_retries = n;
        }
        self
    }

    /// Validate the global and every per-platform retry block.
    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;
        for (id, platform) in &self.platforms {
            if let Some(retry) = &platform.retry {
                retry.validate().map_err(|e| {
                    Error::configuration_with_context(
                        e.to_string(),
                        ErrorContext::new()
                            .with_field_path(format!("platforms.{}.retry", id))
                            .with_source("settings"),
                    )
                })?;
            }
        }
        Ok(())
    }

    pub fn platform(&self, id: &str) -> Option<&PlatformSettings> {
        self.platforms.get(id)
    }

    /// Effective retry configuration for `id`.
    pub fn retry_for(&self, id: &str) -> RetryConfig {
        self.platform(id)
            .and_then(|p| p.retry.clone())
            .unwrap_or_else(|| self.retry.clone())
    }

    /// Build an [`AdapterConfig`] for `adapter`, applying this platform's overrides.
    pub fn adapter_config(&self, adapter: Arc<dyn PlatformAdapter>) -> Result<AdapterConfig> {
        let id = adapter.platform_id().to_string();
        let mut builder = AdapterConfig::builder(adapter).retry(self.retry_for(&id));
        if let Some(platform) = self.platform(&id) {
            if let Some(url) = &platform.base_url {
                builder = builder.base_url(url.clone());
            }
            if let Some(n) = platform.max_auth_refreshes {
                builder = builder.max_auth_refreshes(n);
            }
        }
        builder.build()
    }
}

/// Access token for `platform_id`: OS keyring first, then
/// `<PLATFORM>_ACCESS_TOKEN` (e.g. `GOOGLE_ADS_ACCESS_TOKEN`).
pub fn lookup_access_token(platform_id: &str) -> Option<String> {
    if let Ok(entry) = Entry::new(KEYRING_SERVICE, platform_id) {
        if let Ok(token) = entry.get_password() {
            return Some(token);
        }
    }
    env::var(access_token_env_var(platform_id)).ok()
}

pub fn access_token_env_var(platform_id: &str) -> String {
    format!("{}_ACCESS_TOKEN", platform_id.to_uppercase().replace('-', "_"))
}
