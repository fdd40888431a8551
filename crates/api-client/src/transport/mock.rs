//! Scripted transport for tests
//!
//! Replies are consumed in order; every request is recorded together with
//! the (tokio) instant it was sent, so tests can assert on headers and on
//! the spacing between retries.

use super::{RawResponse, Transport, TransportError};
use crate::request::PreparedRequest;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
enum Reply {
    Response(RawResponse),
    NetworkFailure,
    Timeout,
}

/// A request as the transport saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: PreparedRequest,
    pub sent_at: Instant,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }
}

/// Transport that replays scripted replies
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    /// Queue a response with a JSON body
    pub fn push_json(&self, status: u16, body: &serde_json::Value) -> &Self {
        self.push(Reply::Response(RawResponse::new(status, body.to_string())))
    }

    /// Queue a response with an arbitrary body
    pub fn push_raw(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.push(Reply::Response(RawResponse::new(status, body)))
    }

    /// Queue a status-only response
    pub fn push_status(&self, status: u16) -> &Self {
        self.push_raw(status, Vec::new())
    }

    /// Queue a connection failure
    pub fn push_network_failure(&self) -> &Self {
        self.push(Reply::NetworkFailure)
    }

    /// Queue a timeout
    pub fn push_timeout(&self) -> &Self {
        self.push(Reply::Timeout)
    }

    /// Everything sent so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                request: request.clone(),
                sent_at: Instant::now(),
            });

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::NetworkFailure) => Err(TransportError::Connect("connection refused".to_string())),
            Some(Reply::Timeout) => Err(TransportError::Timeout(Duration::from_secs(30))),
            None => Err(TransportError::Other("no scripted reply left".to_string())),
        }
    }
}
