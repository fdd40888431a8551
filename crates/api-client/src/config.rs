//! Configuration for the Dietlog API client
//!
//! Sources, highest precedence first: builder methods, environment
//! variables, `dietlog.toml`, built-in defaults.

use crate::error::{ApiError, ApiResult};
use crate::policy::RetryPolicy;
use dietlog_core::config::{ApiSection, Config};
use dietlog_core::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Default production API URL
const DEFAULT_BASE_URL: &str = "https://api.dietlog.app/v1";

/// Default client identifier sent as `X-Client-Id`
const DEFAULT_CLIENT_ID: &str = "app.dietlog.client";

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local backend
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    #[default]
    Production,
}

impl Environment {
    /// Parse a loose environment name; unknown values mean production
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Self::Development,
            "staging" | "stage" => Self::Staging,
            _ => Self::Production,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every request path is joined onto
    pub base_url: String,
    /// Value of the `X-Client-Id` header
    pub client_id: String,
    /// Value of the `User-Agent` header
    pub user_agent: String,
    /// Per-attempt timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Retry policy applied to every operation
    pub retry: RetryPolicy,
    /// Current environment
    pub environment: Environment,
    /// Whether food search sends the bearer token
    pub search_requires_auth: bool,
    /// Where the credential is persisted; `None` keeps it in memory only
    pub credentials_path: Option<PathBuf>,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            user_agent: default_user_agent(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            environment: Environment::default(),
            search_requires_auth: true,
            credentials_path: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("dietlog-api-client/{}", env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    /// Load `dietlog.toml` (if any) and apply environment overrides
    pub fn load() -> ApiResult<Self> {
        let file = Config::load(None)?;
        Ok(Self::from_section(&file.schema.api).apply_env(|key| env::var(key).ok()))
    }

    /// Load an explicit TOML file and apply environment overrides
    pub fn load_from(path: &str) -> ApiResult<Self> {
        let file = Config::load(Some(path))?;
        Ok(Self::from_section(&file.schema.api).apply_env(|key| env::var(key).ok()))
    }

    /// Build from the `[api]` section of a config file
    pub fn from_section(section: &ApiSection) -> Self {
        Self {
            base_url: section.base_url.clone(),
            client_id: section.client_id.clone(),
            timeout: Duration::from_secs(section.timeout_secs),
            retry: RetryPolicy::new(RetryConfig {
                max_attempts: section.max_attempts,
                ..RetryConfig::default()
            }),
            search_requires_auth: section.search_requires_auth,
            credentials_path: section.credentials_path.as_ref().map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Recognised variables:
    /// - `DIETLOG_ENV`: development/staging/production
    /// - `DIETLOG_API_URL`: base URL
    /// - `DIETLOG_CLIENT_ID`: client identifier header
    /// - `DIETLOG_TIMEOUT_SECS`: per-attempt timeout
    /// - `DIETLOG_CREDENTIALS_PATH`: credential file location
    #[must_use]
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(environment) = lookup("DIETLOG_ENV") {
            self.environment = Environment::parse(&environment);
            if self.environment == Environment::Development {
                // shorter waits against a local backend; attempt cap stays
                let quick = RetryConfig::quick();
                debug!(
                    base_delay = ?quick.base_delay,
                    max_jitter = ?quick.max_jitter,
                    max_attempts = self.retry.backoff.max_attempts,
                    "Development environment; using quick retry timing"
                );
                self.retry.backoff.base_delay = quick.base_delay;
                self.retry.backoff.max_jitter = quick.max_jitter;
            }
        }
        if let Some(url) = lookup("DIETLOG_API_URL") {
            self.base_url = url;
        }
        if let Some(client_id) = lookup("DIETLOG_CLIENT_ID") {
            self.client_id = client_id;
        }
        if let Some(timeout) = lookup("DIETLOG_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.timeout = Duration::from_secs(timeout);
        }
        if let Some(path) = lookup("DIETLOG_CREDENTIALS_PATH") {
            self.credentials_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Create development configuration (local backend)
    #[must_use]
    pub fn development() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::new(RetryConfig::quick()),
            environment: Environment::Development,
            ..Self::default()
        }
    }

    /// Create staging configuration
    #[must_use]
    pub fn staging() -> Self {
        Self {
            base_url: "https://staging-api.dietlog.app/v1".to_string(),
            environment: Environment::Staging,
            ..Self::default()
        }
    }

    /// Create production configuration
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set the client identifier
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builder-style method to choose whether search is authenticated
    #[must_use]
    pub fn with_search_auth(mut self, required: bool) -> Self {
        self.search_requires_auth = required;
        self
    }

    /// Builder-style method to set the credential file
    #[must_use]
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiError::config("base_url must start with http:// or https://"));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        if self.retry.backoff.max_attempts == 0 {
            return Err(ApiError::config("retry.max_attempts must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.base_url.starts_with("https://"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.backoff.max_attempts, 3);
        assert_eq!(config.retry.backoff.base_delay, Duration::from_secs(2));
        assert!(config.search_requires_auth);
        assert!(config.user_agent.starts_with("dietlog-api-client/"));
    }

    #[test]
    fn test_development_config() {
        let config = ClientConfig::development();
        assert!(config.base_url.contains("localhost"));
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("DEV"), Environment::Development);
        assert_eq!(Environment::parse("stage"), Environment::Staging);
        assert_eq!(Environment::parse(""), Environment::Production);
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::default().apply_env(lookup(&[
            ("DIETLOG_API_URL", "http://10.0.0.2:9000/api"),
            ("DIETLOG_TIMEOUT_SECS", "5"),
            ("DIETLOG_ENV", "local"),
            ("DIETLOG_CREDENTIALS_PATH", "/tmp/creds.json"),
        ]));

        assert_eq!(config.base_url, "http://10.0.0.2:9000/api");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.retry.backoff, RetryConfig::quick());
        assert_eq!(config.credentials_path, Some(PathBuf::from("/tmp/creds.json")));
    }

    #[test]
    fn test_development_env_keeps_configured_attempts() {
        let section = ApiSection {
            max_attempts: 5,
            ..ApiSection::default()
        };
        let config =
            ClientConfig::from_section(&section).apply_env(lookup(&[("DIETLOG_ENV", "development")]));

        assert_eq!(config.retry.backoff.max_attempts, 5);
        assert_eq!(config.retry.backoff.base_delay, RetryConfig::quick().base_delay);
        assert_eq!(config.retry.backoff.max_jitter, RetryConfig::quick().max_jitter);
    }

    #[test]
    fn test_bad_timeout_env_is_ignored() {
        let config = ClientConfig::default().apply_env(lookup(&[("DIETLOG_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_section() {
        let section = ApiSection {
            base_url: "https://example.test".to_string(),
            max_attempts: 5,
            search_requires_auth: false,
            ..ApiSection::default()
        };
        let config = ClientConfig::from_section(&section);
        assert_eq!(config.base_url, "https://example.test");
        assert_eq!(config.retry.backoff.max_attempts, 5);
        assert!(!config.search_requires_auth);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::default()
            .with_base_url("https://test.dietlog.app/v2")
            .with_timeout(Duration::from_secs(60))
            .with_search_auth(false);

        assert_eq!(config.base_url, "https://test.dietlog.app/v2");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(!config.search_requires_auth);
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::default().validate().is_ok());

        let err = ClientConfig::default().with_base_url("").validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);

        assert!(ClientConfig::default().with_base_url("ftp://x").validate().is_err());
        assert!(ClientConfig::default().with_timeout(Duration::ZERO).validate().is_err());
    }
}
