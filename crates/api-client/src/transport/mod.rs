//! The network seam
//!
//! The pipeline only needs "send these bytes, give me status and body".
//! [`HttpTransport`] does that with `reqwest`; [`MockTransport`] replays a
//! script for tests.

mod http;
pub mod mock;

use crate::request::PreparedRequest;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use http::HttpTransport;
pub use mock::MockTransport;

/// Status and body of a received response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failure to obtain any response
#[derive(Error, Debug)]
pub enum TransportError {
    /// The attempt exceeded its timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Anything else below HTTP
    #[error("transport failure: {0}")]
    Other(String),
}

/// Sends one prepared request, once
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError>;
}
