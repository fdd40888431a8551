use super::{RawResponse, Transport, TransportError};
use crate::error::{ApiError, ApiResult};
use crate::request::PreparedRequest;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::trace;

/// `reqwest`-backed transport with a fixed per-attempt timeout
#[derive(Clone)]
pub struct HttpTransport {
    inner: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let inner = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::config(format!("Failed to build HTTP client: {e}")).with_source(e))?;
        Ok(Self { inner, timeout })
    }

    fn classify(&self, err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .inner
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await.map_err(|e| self.classify(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.classify(&e))?;

        trace!(
            request_id = %request.request_id(),
            status,
            bytes = body.len(),
            "Response received"
        );
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        assert!(HttpTransport::new(Duration::from_secs(30)).is_ok());
    }
}
