//! Per-attempt retry decisions
//!
//! One [`RetryPolicy`] is applied to every typed operation. Given the
//! outcome of an attempt and the call's [`RetryState`], it decides what the
//! pipeline does next:
//!
//! | Outcome | Decision |
//! |---------|----------|
//! | 2xx | accept and decode |
//! | 401 | clear credentials, fail `Unauthenticated` |
//! | 429, attempts left | wait `base + U(0, jitter)`, retry |
//! | other status, or 429 exhausted | fail `Transport` |
//! | no response | fail `NetworkUnavailable` (retry only if opted in) |
//! | timeout | fail `NetworkUnavailable` |

use dietlog_core::retry::{RetryConfig, RetryState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What one attempt produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A response with this HTTP status
    Status(u16),
    /// Connection-level failure, nothing received
    NetworkFailure,
    /// The attempt exceeded its timeout
    TimedOut,
}

/// What the pipeline should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Decode the response body
    Accept,
    /// Wait, then re-issue the same request
    Retry(Duration),
    /// The server rejected the credential
    Unauthorized,
    /// Surface the failure
    Fail,
}

/// Retry policy shared by all operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempt cap and backoff timing
    pub backoff: RetryConfig,
    /// Also retry connection failures (never timeouts)
    #[serde(default)]
    pub retry_network_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: RetryConfig::default(),
            retry_network_errors: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(backoff: RetryConfig) -> Self {
        Self {
            backoff,
            retry_network_errors: false,
        }
    }

    #[must_use]
    pub fn with_network_retries(mut self, enabled: bool) -> Self {
        self.retry_network_errors = enabled;
        self
    }

    /// Fresh attempt counter for a new logical call
    pub fn start(&self) -> RetryState {
        RetryState::new(self.backoff.max_attempts)
    }

    pub fn decide(&self, state: &RetryState, outcome: AttemptOutcome) -> Decision {
        match outcome {
            AttemptOutcome::Status(status) if (200..300).contains(&status) => Decision::Accept,
            AttemptOutcome::Status(401) => Decision::Unauthorized,
            AttemptOutcome::Status(429) if state.can_retry() => self.retry_after(state),
            AttemptOutcome::NetworkFailure if self.retry_network_errors && state.can_retry() => {
                self.retry_after(state)
            }
            AttemptOutcome::Status(_) | AttemptOutcome::NetworkFailure | AttemptOutcome::TimedOut => {
                Decision::Fail
            }
        }
    }

    fn retry_after(&self, state: &RetryState) -> Decision {
        Decision::Retry(self.backoff.delay_for_attempt(state.attempt + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    fn state_at(attempt: u32) -> RetryState {
        let mut state = RetryState::new(3);
        for _ in 1..attempt {
            state.advance();
        }
        state
    }

    #[test]
    fn test_success_is_accepted() {
        assert_eq!(policy().decide(&state_at(1), AttemptOutcome::Status(200)), Decision::Accept);
        assert_eq!(policy().decide(&state_at(3), AttemptOutcome::Status(204)), Decision::Accept);
    }

    #[test]
    fn test_rate_limit_retries_with_backoff() {
        match policy().decide(&state_at(1), AttemptOutcome::Status(429)) {
            Decision::Retry(delay) => {
                assert!(delay >= Duration::from_secs(2));
                assert!(delay < Duration::from_secs(3));
            }
            other => panic!("expected retry, got {other:?}"),
        }
        assert!(matches!(
            policy().decide(&state_at(2), AttemptOutcome::Status(429)),
            Decision::Retry(_)
        ));
    }

    #[test]
    fn test_rate_limit_exhausted_fails() {
        assert_eq!(policy().decide(&state_at(3), AttemptOutcome::Status(429)), Decision::Fail);
    }

    #[test]
    fn test_unauthorized_never_retries() {
        assert_eq!(
            policy().decide(&state_at(1), AttemptOutcome::Status(401)),
            Decision::Unauthorized
        );
    }

    #[test]
    fn test_server_errors_fail_immediately() {
        for status in [400, 403, 404, 500, 502, 503] {
            assert_eq!(policy().decide(&state_at(1), AttemptOutcome::Status(status)), Decision::Fail);
        }
    }

    #[test]
    fn test_network_failures() {
        assert_eq!(policy().decide(&state_at(1), AttemptOutcome::NetworkFailure), Decision::Fail);

        let opted_in = policy().with_network_retries(true);
        assert!(matches!(
            opted_in.decide(&state_at(1), AttemptOutcome::NetworkFailure),
            Decision::Retry(_)
        ));
        assert_eq!(opted_in.decide(&state_at(1), AttemptOutcome::TimedOut), Decision::Fail);
        assert_eq!(opted_in.decide(&state_at(3), AttemptOutcome::NetworkFailure), Decision::Fail);
    }
}
