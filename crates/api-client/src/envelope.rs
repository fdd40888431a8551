//! Response envelope decoding
//!
//! Every response body has the shape
//! `{"success": bool, "data": ..., "request_id": "...", "message": "..."}`.
//! Decoding happens in two steps so that `success: false` is reported as an
//! application error even when `data` would not match the target type.

use crate::error::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Standard response wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default)]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Successful envelope around `data`
    pub fn ok(data: T, request_id: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            request_id: request_id.into(),
            message: None,
        }
    }

    /// Failed envelope with a message
    pub fn failure(message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            request_id: request_id.into(),
            message: Some(message.into()),
        }
    }
}

/// A type that can be the `data` of an envelope
///
/// List-shaped payloads treat a missing `data` as empty; everything else
/// treats it as a malformed response.
pub trait Payload: DeserializeOwned {
    /// Value to use when `data` is missing or null
    fn when_absent() -> Option<Self> {
        None
    }
}

impl<T: DeserializeOwned> Payload for Vec<T> {
    fn when_absent() -> Option<Self> {
        Some(Vec::new())
    }
}

impl Payload for serde_json::Value {}

/// Paginated list payload: `{"list": [...], "total": n}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            total: 0,
        }
    }
}

impl<T> Page<T> {
    pub fn into_items(self) -> Vec<T> {
        self.list
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl<T: DeserializeOwned> Payload for Page<T> {
    fn when_absent() -> Option<Self> {
        Some(Self::default())
    }
}

/// Parse the envelope without interpreting `data`
pub fn parse(body: &[u8]) -> ApiResult<Envelope<serde_json::Value>> {
    serde_json::from_slice(body).map_err(|e| {
        ApiError::malformed(format!("Response is not a valid envelope: {e}")).with_source(e)
    })
}

/// Decode a response body into `T`
pub fn decode<T: Payload>(body: &[u8]) -> ApiResult<T> {
    let envelope = parse(body)?;
    let request_id = (!envelope.request_id.is_empty()).then_some(envelope.request_id);

    let result = if envelope.success {
        match envelope.data {
            None | Some(serde_json::Value::Null) => T::when_absent()
                .ok_or_else(|| ApiError::malformed("Successful response carried no data")),
            Some(data) => serde_json::from_value(data).map_err(|e| {
                ApiError::malformed(format!("Unexpected data shape: {e}")).with_source(e)
            }),
        }
    } else {
        Err(ApiError::application(envelope.message))
    };

    result.map_err(|e| match request_id {
        Some(id) => e.with_request_id(id),
        None => e,
    })
}
