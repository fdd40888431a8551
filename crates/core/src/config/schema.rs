//! Configuration schema definitions
//!
//! Mirrors the sections of `dietlog.toml`. Every field has a default so a
//! partial file is always valid.

use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub telemetry: TelemetrySection,
}

/// `[api]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    /// Base URL every request path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Value of the `X-Client-Id` header
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per logical call when rate limited
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Whether food search sends the bearer token
    #[serde(default = "default_true")]
    pub search_requires_auth: bool,

    /// Where the session credential is persisted
    #[serde(default)]
    pub credentials_path: Option<String>,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_id: default_client_id(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            search_requires_auth: true,
            credentials_path: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.dietlog.app/v1".to_string()
}

fn default_client_id() -> String {
    "app.dietlog.client".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

/// `[telemetry]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySection {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for daily-rolling log files; stderr only when absent
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
