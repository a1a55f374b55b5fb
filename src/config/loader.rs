//! Remote configuration loading.
//!
//! Two transports fetch the same JSON document: a GET against the local
//! configuration-extension endpoint (the hosted backend) or a parameter read
//! through the SSM API. The hosted backend wins when both are configured.
//! Loading never fails the invocation — every failure path logs and degrades
//! to the empty configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::cache::{self, CachedEntry};
use crate::config::schema::Configuration;
use crate::config::validation::parse_flags;
use crate::observability::SOURCE;

/// Parameter-store backend selector; the value is the parameter name.
pub const PARAM_VAR: &str = "FAILURE_INJECTION_PARAM";
/// Hosted-backend application name.
pub const APPCONFIG_APPLICATION_VAR: &str = "FAILURE_APPCONFIG_APPLICATION";
/// Hosted-backend environment name.
pub const APPCONFIG_ENVIRONMENT_VAR: &str = "FAILURE_APPCONFIG_ENVIRONMENT";
/// Hosted-backend configuration profile; presence selects the backend.
pub const APPCONFIG_CONFIGURATION_VAR: &str = "FAILURE_APPCONFIG_CONFIGURATION";
/// Local extension port override.
pub const APPCONFIG_PORT_VAR: &str = "AWS_APPCONFIG_EXTENSION_HTTP_PORT";

const DEFAULT_APPCONFIG_PORT: &str = "2772";

/// Why a fetch produced no document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0} not set")]
    MissingEnv(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("parameter has no value")]
    MissingValue,
    #[error("response is not valid JSON: {0}")]
    Json(String),
}

/// A configuration transport. The seam tests replace.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    /// Short backend identifier for the cold-start record.
    fn backend(&self) -> &'static str;

    /// Fetch the raw configuration document.
    async fn fetch(&self) -> Result<Value, FetchError>;
}

/// Anything the orchestrator can obtain a configuration from.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn get_config(&self) -> Configuration;
}

fn env_non_empty(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn require_env(name: &'static str) -> Result<String, FetchError> {
    env_non_empty(name).ok_or(FetchError::MissingEnv(name))
}

fn hosted_backend_selected() -> bool {
    env_non_empty(APPCONFIG_CONFIGURATION_VAR).is_some()
}

/// GET against the local configuration-extension endpoint.
pub struct AppConfigFetcher;

#[async_trait]
impl ConfigFetcher for AppConfigFetcher {
    fn backend(&self) -> &'static str {
        "appconfig"
    }

    async fn fetch(&self) -> Result<Value, FetchError> {
        let port = env_non_empty(APPCONFIG_PORT_VAR)
            .unwrap_or_else(|| DEFAULT_APPCONFIG_PORT.to_string());
        let application = require_env(APPCONFIG_APPLICATION_VAR)?;
        let environment = require_env(APPCONFIG_ENVIRONMENT_VAR)?;
        let configuration = require_env(APPCONFIG_CONFIGURATION_VAR)?;

        let url = format!(
            "http://localhost:{port}/applications/{application}/environments/{environment}/configurations/{configuration}"
        );

        let response = reqwest::get(&url)
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Json(e.to_string()))
    }
}

/// Parameter read through the SSM API. The client is built on first use and
/// reused for the container's lifetime.
pub struct SsmFetcher {
    client: Mutex<Option<aws_sdk_ssm::Client>>,
}

impl SsmFetcher {
    pub fn new() -> Self {
        Self {
            client: Mutex::new(None),
        }
    }

    async fn client(&self) -> aws_sdk_ssm::Client {
        let mut guard = self.client.lock().await;
        if let Some(client) = guard.as_ref() {
            return client.clone();
        }
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = aws_sdk_ssm::Client::new(&sdk_config);
        *guard = Some(client.clone());
        client
    }
}

impl Default for SsmFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigFetcher for SsmFetcher {
    fn backend(&self) -> &'static str {
        "ssm"
    }

    async fn fetch(&self) -> Result<Value, FetchError> {
        let parameter_name = require_env(PARAM_VAR)?;

        let response = self
            .client()
            .await
            .get_parameter()
            .name(&parameter_name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let raw_value = response
            .parameter()
            .and_then(|p| p.value())
            .ok_or(FetchError::MissingValue)?;

        serde_json::from_str(raw_value).map_err(|e| FetchError::Json(e.to_string()))
    }
}

/// Fetches, validates, and caches the failure configuration.
pub struct ConfigService {
    cache: Mutex<Option<CachedEntry>>,
    /// Test seam; `None` selects the backend from the environment per call.
    fetcher: Option<Arc<dyn ConfigFetcher>>,
    ssm: SsmFetcher,
    cold_start_logged: AtomicBool,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(None),
            fetcher: None,
            ssm: SsmFetcher::new(),
            cold_start_logged: AtomicBool::new(false),
        }
    }

    /// A service that fetches through the given transport instead of
    /// selecting one from the environment.
    pub fn with_fetcher(fetcher: Arc<dyn ConfigFetcher>) -> Self {
        Self {
            fetcher: Some(fetcher),
            ..Self::new()
        }
    }

    /// Drop the cached entry; the next call fetches fresh.
    pub async fn clear_cache(&self) {
        *self.cache.lock().await = None;
    }

    /// Fetch the configuration, honoring the cache.
    ///
    /// Never fails: transport errors, bad statuses, missing values, and
    /// unparseable documents each log one error record and yield the empty
    /// configuration. When no backend is configured the result is empty with
    /// no logging at all.
    pub async fn get_config(&self) -> Configuration {
        let hosted = hosted_backend_selected();
        let ttl = cache::ttl(hosted);

        {
            let guard = self.cache.lock().await;
            if let Some(entry) = guard.as_ref() {
                if entry.is_fresh(ttl) {
                    return entry.config.clone();
                }
            }
        }

        let (backend, result) = match &self.fetcher {
            Some(fetcher) => (fetcher.backend(), fetcher.fetch().await),
            None => {
                if hosted {
                    let fetcher = AppConfigFetcher;
                    (fetcher.backend(), fetcher.fetch().await)
                } else if env_non_empty(PARAM_VAR).is_some() {
                    (self.ssm.backend(), self.ssm.fetch().await)
                } else {
                    return Configuration::new();
                }
            }
        };

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    source = SOURCE,
                    action = "error",
                    backend = backend,
                    message = "error fetching config",
                    error = %e,
                );
                return Configuration::new();
            }
        };

        let config = parse_flags(&raw);

        if !self.cold_start_logged.swap(true, Ordering::Relaxed) {
            info!(
                source = SOURCE,
                action = "config",
                backend = backend,
                cache_ttl_seconds = ttl.as_secs_f64(),
                enabled_modes = ?config.enabled_modes(),
            );
        }

        *self.cache.lock().await = Some(CachedEntry::new(config.clone()));
        config
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigProvider for ConfigService {
    async fn get_config(&self) -> Configuration {
        ConfigService::get_config(self).await
    }
}

static SHARED: OnceLock<Arc<ConfigService>> = OnceLock::new();

/// The process-wide service backing the default orchestrator options.
pub fn shared() -> Arc<ConfigService> {
    SHARED
        .get_or_init(|| Arc::new(ConfigService::new()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct CountingFetcher {
        calls: AtomicU32,
        document: Value,
    }

    #[async_trait]
    impl ConfigFetcher for CountingFetcher {
        fn backend(&self) -> &'static str {
            "test"
        }

        async fn fetch(&self) -> Result<Value, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.document.clone())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl ConfigFetcher for FailingFetcher {
        fn backend(&self) -> &'static str {
            "test"
        }

        async fn fetch(&self) -> Result<Value, FetchError> {
            Err(FetchError::Status(503))
        }
    }

    #[tokio::test]
    async fn fetch_failure_yields_empty_config() {
        let service = ConfigService::with_fetcher(Arc::new(FailingFetcher));
        assert!(service.get_config().await.is_empty());
    }

    #[tokio::test]
    async fn parsed_flags_survive_the_fetch() {
        let fetcher = CountingFetcher {
            calls: AtomicU32::new(0),
            document: serde_json::json!({
                "latency": { "enabled": true, "min_latency": 5, "max_latency": 10 }
            }),
        };
        let service = ConfigService::with_fetcher(Arc::new(fetcher));
        let config = service.get_config().await;
        assert_eq!(config.len(), 1);
        assert_eq!(config.enabled_modes(), vec!["latency"]);
    }
}
