//! Error types for the API client

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// What went wrong, independent of where
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No credential, an expired one, or the server rejected it
    Unauthenticated,
    /// The request could not be built; nothing was sent
    InvalidRequest,
    /// The server answered with a non-2xx status
    Transport,
    /// No response was received (connect failure, timeout)
    NetworkUnavailable,
    /// The body was not a valid envelope or `data` did not match
    MalformedResponse,
    /// The envelope reported `success: false`
    ApplicationError,
    /// Client configuration could not be loaded or is invalid
    Config,
}

impl ErrorKind {
    /// Stable identifier, used in metric names
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidRequest => "invalid_request",
            Self::Transport => "transport",
            Self::NetworkUnavailable => "network_unavailable",
            Self::MalformedResponse => "malformed_response",
            Self::ApplicationError => "application_error",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API client error
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct ApiError {
    /// Error category
    pub kind: ErrorKind,
    /// HTTP status, when a response was received
    pub http_status: Option<u16>,
    /// Human-readable message; the server's own text when it sent one
    pub message: String,
    /// Server request id, or the client correlation id when the server gave none
    pub request_id: Option<String>,
    /// Underlying cause
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status: None,
            message: message.into(),
            request_id: None,
            source: None,
        }
    }

    /// Missing, expired or rejected credential
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    /// Request rejected before any I/O
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Non-2xx HTTP response
    pub fn transport(status: u16, message: impl Into<String>) -> Self {
        Self {
            http_status: Some(status),
            ..Self::new(ErrorKind::Transport, message)
        }
    }

    /// No response received
    pub fn network_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkUnavailable, message)
    }

    /// Undecodable response body
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, message)
    }

    /// Envelope with `success: false`
    pub fn application(message: Option<String>) -> Self {
        Self::new(
            ErrorKind::ApplicationError,
            message.unwrap_or_else(|| "Request was not successful".to_string()),
        )
    }

    /// Configuration problem
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Attach the HTTP status that caused the error
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Attach a request id
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Attach a request id only if none is set yet
    #[must_use]
    pub fn or_request_id(mut self, request_id: &str) -> Self {
        if self.request_id.is_none() {
            self.request_id = Some(request_id.to_string());
        }
        self
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The user has to sign in again before this can succeed
    #[must_use]
    pub fn requires_login(&self) -> bool {
        self.kind == ErrorKind::Unauthenticated
    }

    /// Offering a manual "try again" makes sense
    #[must_use]
    pub fn is_retryable_by_user(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Transport | ErrorKind::NetworkUnavailable
        )
    }

    /// The server rate limited every attempt
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.http_status == Some(429)
    }

    /// Text suitable for showing to the user as-is
    #[must_use]
    pub fn display_message(&self) -> &str {
        &self.message
    }
}

impl From<dietlog_core::Error> for ApiError {
    fn from(err: dietlog_core::Error) -> Self {
        Self::config(err.message.clone()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = ApiError::transport(503, "Service Unavailable");
        assert_eq!(err.to_string(), "transport: Service Unavailable");
        assert_eq!(err.http_status, Some(503));
    }

    #[test]
    fn test_application_error_keeps_message() {
        let err = ApiError::application(Some("Food not found".to_string()));
        assert_eq!(err.kind, ErrorKind::ApplicationError);
        assert_eq!(err.display_message(), "Food not found");

        let fallback = ApiError::application(None);
        assert!(!fallback.message.is_empty());
    }

    #[test]
    fn test_or_request_id_does_not_overwrite() {
        let err = ApiError::malformed("bad")
            .with_request_id("server-id")
            .or_request_id("client-id");
        assert_eq!(err.request_id.as_deref(), Some("server-id"));

        let err = ApiError::malformed("bad").or_request_id("client-id");
        assert_eq!(err.request_id.as_deref(), Some("client-id"));
    }

    #[test]
    fn test_user_facing_helpers() {
        assert!(ApiError::unauthenticated("expired").requires_login());
        assert!(ApiError::network_unavailable("offline").is_retryable_by_user());
        assert!(ApiError::transport(429, "slow down").is_rate_limited());
        assert!(!ApiError::application(None).is_retryable_by_user());
    }

    #[test]
    fn test_core_error_maps_to_config() {
        let err: ApiError = dietlog_core::Error::config("bad base url").into();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.source.is_some());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NetworkUnavailable).unwrap();
        assert_eq!(json, "\"network_unavailable\"");
    }
}
