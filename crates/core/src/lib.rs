//! Core utilities for the Dietlog session client
//!
//! This crate provides the pieces the API client builds on:
//!
//! - **Error handling**: Structured errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML-based configuration with defaults for every field
//! - **Storage**: Key-value persistence with all-or-nothing writes
//! - **Retry timing**: Jittered delays and per-call attempt tracking
//! - **Timestamps**: Canonical RFC 3339 handling for token expiry
//!
//! # Example
//!
//! ```rust,no_run
//! use dietlog_core::config::Config;
//! use dietlog_core::storage::{FileStore, KeyValueStore};
//!
//! let config = Config::load(None).expect("invalid dietlog.toml");
//! println!("API at {}", config.schema.api.base_url);
//!
//! let store = FileStore::open(FileStore::default_path()).expect("unreadable session file");
//! let token = store.get("access_token").expect("store lock poisoned");
//! println!("Signed in: {}", token.is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod retry;
pub mod storage;
pub mod timestamp;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ApiSection, Config, ConfigSchema, TelemetrySection};
    pub use crate::error::{Error, ErrorCode, Result, ResultExt};
    pub use crate::retry::{RetryConfig, RetryState};
    pub use crate::storage::{FileStore, KeyValueStore, MemoryStore};
}
