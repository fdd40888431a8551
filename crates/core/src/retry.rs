//! Retry timing and per-call attempt bookkeeping
//!
//! Provides the backoff side of a retry policy:
//! - Fixed base delay plus uniform random jitter
//! - Attempt caps tracked per logical call
//!
//! Deciding *whether* an outcome is retryable belongs to the caller; this
//! module only answers "how long to wait" and "are attempts left".
//!
//! # Example
//!
//! ```rust
//! use dietlog_core::retry::{RetryConfig, RetryState};
//!
//! let config = RetryConfig::default();
//! let mut state = RetryState::new(config.max_attempts);
//! assert!(state.can_retry());
//! state.advance();
//! assert_eq!(state.attempt, 2);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Fixed delay before every retry
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added to `base_delay`
    #[serde(with = "duration_ms")]
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Create a config for quick retries (local development)
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_jitter: Duration::from_millis(100),
        }
    }

    /// Create a config with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Calculate the wait before the given attempt (1-based).
    ///
    /// The first attempt never waits. Every later attempt waits
    /// `base_delay + U(0, max_jitter)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.base_delay + self.jitter()
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let fraction: f64 = rand::thread_rng().gen_range(0.0..1.0);
        self.max_jitter.mul_f64(fraction)
    }
}

/// Attempt counter for a single logical call. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Current attempt, starting at 1
    pub attempt: u32,
    /// Attempt cap
    pub max_attempts: u32,
}

impl RetryState {
    /// Start a new call at attempt 1
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 1,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Whether another attempt is allowed after the current one
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Move to the next attempt
    pub fn advance(&mut self) {
        self.attempt += 1;
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_has_no_delay() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::ZERO);
    }

    #[test]
    fn test_delay_stays_within_jitter_window() {
        let config = RetryConfig::default();
        for attempt in 2..50 {
            let delay = config.delay_for_attempt(attempt);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay < Duration::from_secs(3));
        }
    }

    #[test]
    fn test_no_jitter_is_exact() {
        let config = RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_jitter: Duration::ZERO,
        };
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(250));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(250));
    }

    #[test]
    fn test_retry_state_caps_attempts() {
        let mut state = RetryState::new(3);
        assert!(state.can_retry());
        state.advance();
        assert!(state.can_retry());
        state.advance();
        assert_eq!(state.attempt, 3);
        assert!(!state.can_retry());
    }

    #[test]
    fn test_retry_state_never_zero_attempts() {
        let state = RetryState::new(0);
        assert_eq!(state.max_attempts, 1);
        assert!(!state.can_retry());
    }

    #[test]
    fn test_config_serde_uses_millis() {
        let json = serde_json::to_value(RetryConfig::default()).unwrap();
        assert_eq!(json["base_delay"], 2000);
        assert_eq!(json["max_jitter"], 1000);

        let parsed: RetryConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, RetryConfig::default());
    }
}
