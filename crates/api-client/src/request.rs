//! Request description and preparation
//!
//! A [`RequestSpec`] describes one logical call. [`RequestBuilder`] turns it
//! into a [`PreparedRequest`] with default headers, auth and an encoded
//! body. Everything that can fail here fails before any network I/O.

use crate::credentials::CredentialStore;
use crate::error::{ApiError, ApiResult};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::{Method, Url};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Request correlation ID header
pub const X_REQUEST_ID: &str = "x-request-id";

/// Client/bundle identifier header
pub const X_CLIENT_ID: &str = "x-client-id";

/// Server-side dedupe key for action endpoints
pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

/// One logical call, before preparation
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    json_body: Option<serde_json::Value>,
    headers: Vec<(String, String)>,
    requires_auth: bool,
    idempotency_key: Option<String>,
}

impl RequestSpec {
    /// New spec; requires auth unless told otherwise
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            json_body: None,
            headers: Vec::new(),
            requires_auth: true,
            idempotency_key: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter; order is preserved on the wire
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Set a JSON body from any serializable value
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ApiResult<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            ApiError::invalid_request(format!("Body is not serializable: {e}")).with_source(e)
        })?;
        self.json_body = Some(value);
        Ok(self)
    }

    /// Add an extra header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether a valid credential is needed
    #[must_use]
    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    /// Attach a fresh idempotency key, reused by every attempt of this call
    #[must_use]
    pub fn idempotent(mut self) -> Self {
        self.idempotency_key = Some(Uuid::new_v4().to_string());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn json_body(&self) -> Option<&serde_json::Value> {
        self.json_body.as_ref()
    }

    pub fn is_auth_required(&self) -> bool {
        self.requires_auth
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }
}

/// A request ready to hand to a transport
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    request_id: String,
    bearer: Option<String>,
}

impl PreparedRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Client correlation id, constant across retries
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// Builds [`PreparedRequest`]s against a base URL
pub struct RequestBuilder {
    base_url: String,
    client_id: String,
    user_agent: String,
    credentials: Arc<CredentialStore>,
}

impl RequestBuilder {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        user_agent: impl Into<String>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            user_agent: user_agent.into(),
            credentials,
        }
    }

    /// Prepare `spec` for sending
    pub fn build(&self, spec: &RequestSpec) -> ApiResult<PreparedRequest> {
        let mut url = self.resolve(spec.path())?;
        if !spec.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(spec.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let request_id = Uuid::new_v4().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&self.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(X_CLIENT_ID, header_value(&self.client_id)?);
        headers.insert(X_REQUEST_ID, header_value(&request_id)?);

        for (name, value) in &spec.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::invalid_request(format!("Bad header name {name:?}")).with_source(e))?;
            headers.insert(name, header_value(value)?);
        }

        if let Some(key) = spec.idempotency_key() {
            headers.insert(IDEMPOTENCY_KEY, header_value(key)?);
        }

        let bearer = if spec.requires_auth {
            let token = self.valid_token()?;
            headers.insert(AUTHORIZATION, bearer_value(&token)?);
            Some(token)
        } else {
            None
        };

        let body = match spec.json_body() {
            Some(value) => {
                let bytes = serde_json::to_vec(value).map_err(|e| {
                    ApiError::invalid_request(format!("Body encoding failed: {e}")).with_source(e)
                })?;
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Some(bytes)
            }
            None => None,
        };

        Ok(PreparedRequest {
            method: spec.method.clone(),
            url,
            headers,
            body,
            request_id,
            bearer,
        })
    }

    /// Re-check auth before a retry.
    ///
    /// The `Authorization` header is replaced only if the stored token
    /// changed since the request was prepared. A credential that became
    /// invalid in the meantime stops the call.
    pub fn reauthorize(&self, request: &mut PreparedRequest, spec: &RequestSpec) -> ApiResult<()> {
        if !spec.requires_auth {
            return Ok(());
        }

        let token = self.valid_token()?;
        if request.bearer.as_deref() != Some(token.as_str()) {
            debug!(request_id = %request.request_id, "Credential changed between attempts");
            request.headers.insert(AUTHORIZATION, bearer_value(&token)?);
            request.bearer = Some(token);
        }
        Ok(())
    }

    fn valid_token(&self) -> ApiResult<String> {
        // one snapshot: token and expiry always belong together
        match self.credentials.get() {
            Some(credential) if credential.is_valid() => Ok(credential.access_token),
            Some(_) => Err(ApiError::unauthenticated("Session has expired")),
            None => Err(ApiError::unauthenticated("Not signed in")),
        }
    }

    fn resolve(&self, path: &str) -> ApiResult<Url> {
        let path = path.trim().trim_start_matches('/');
        if path.is_empty() {
            return Err(ApiError::invalid_request("Request path is empty"));
        }

        let joined = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let url = Url::parse(&joined).map_err(|e| {
            ApiError::invalid_request(format!("Malformed URL {joined:?}: {e}")).with_source(e)
        })?;

        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(url),
            _ => Err(ApiError::invalid_request(format!(
                "Base URL must be http(s) with a host: {}",
                self.base_url
            ))),
        }
    }
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::invalid_request(format!("Bad header value {value:?}")).with_source(e))
}

fn bearer_value(token: &str) -> ApiResult<HeaderValue> {
    let mut value = header_value(&format!("Bearer {token}"))?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credential;
    use crate::error::ErrorKind;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn builder_with(credentials: Arc<CredentialStore>) -> RequestBuilder {
        RequestBuilder::new(
            "https://api.example.test/v1/",
            "app.dietlog.test",
            "dietlog-test/1.0",
            credentials,
        )
    }

    fn signed_in(token: &str) -> Arc<CredentialStore> {
        let store = Arc::new(CredentialStore::in_memory());
        store.save(Credential::new(token, Utc::now() + Duration::hours(1), "dev"));
        store
    }

    #[test]
    fn test_default_headers_always_present() {
        let builder = builder_with(Arc::new(CredentialStore::in_memory()));
        let request = builder
            .build(&RequestSpec::get("health").requires_auth(false))
            .unwrap();

        assert_eq!(request.header("user-agent"), Some("dietlog-test/1.0"));
        assert_eq!(request.header(X_CLIENT_ID), Some("app.dietlog.test"));
        assert_eq!(request.header(X_REQUEST_ID), Some(request.request_id()));
        assert!(request.header("authorization").is_none());
        assert_eq!(request.url().as_str(), "https://api.example.test/v1/health");
    }

    #[test]
    fn test_auth_required_without_credential_fails_early() {
        let builder = builder_with(Arc::new(CredentialStore::in_memory()));
        let err = builder.build(&RequestSpec::get("users/me")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
    }

    #[test]
    fn test_expired_credential_fails_early() {
        let store = Arc::new(CredentialStore::in_memory());
        store.save(Credential::new("tok", Utc::now() - Duration::minutes(1), "dev"));
        let err = builder_with(store)
            .build(&RequestSpec::get("users/me"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
    }

    #[test]
    fn test_bearer_attached() {
        let request = builder_with(signed_in("tok"))
            .build(&RequestSpec::get("users/me"))
            .unwrap();
        assert_eq!(request.header("authorization"), Some("Bearer tok"));
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let spec = RequestSpec::post("diary/records")
            .json(&serde_json::json!({"food_id": 7}))
            .unwrap();
        let request = builder_with(signed_in("tok")).build(&spec).unwrap();

        assert_eq!(request.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(request.body().unwrap()).unwrap();
        assert_eq!(body["food_id"], 7);
    }

    #[test]
    fn test_query_is_encoded_in_order() {
        let spec = RequestSpec::get("foods/search")
            .query("keyword", "green apple & pear")
            .query("page", 1)
            .query("limit", 20)
            .requires_auth(false);
        let request = builder_with(Arc::new(CredentialStore::in_memory()))
            .build(&spec)
            .unwrap();

        assert_eq!(
            request.url().query(),
            Some("keyword=green+apple+%26+pear&page=1&limit=20")
        );
    }

    #[test]
    fn test_empty_path_is_invalid() {
        let builder = builder_with(signed_in("tok"));
        let err = builder.build(&RequestSpec::get("  ")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_malformed_base_url_is_invalid() {
        let builder = RequestBuilder::new(
            "not a url",
            "id",
            "ua",
            Arc::new(CredentialStore::in_memory()),
        );
        let err = builder
            .build(&RequestSpec::get("health").requires_auth(false))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_idempotency_key_header() {
        let spec = RequestSpec::post("community/posts").idempotent();
        let key = spec.idempotency_key().unwrap().to_string();
        let request = builder_with(signed_in("tok")).build(&spec).unwrap();
        assert_eq!(request.header(IDEMPOTENCY_KEY), Some(key.as_str()));
    }

    #[test]
    fn test_reauthorize_swaps_changed_token_only() {
        let store = signed_in("first");
        let builder = builder_with(Arc::clone(&store));
        let spec = RequestSpec::get("users/me");
        let mut request = builder.build(&spec).unwrap();

        builder.reauthorize(&mut request, &spec).unwrap();
        assert_eq!(request.header("authorization"), Some("Bearer first"));

        store.save(Credential::new("second", Utc::now() + Duration::hours(1), "dev"));
        builder.reauthorize(&mut request, &spec).unwrap();
        assert_eq!(request.header("authorization"), Some("Bearer second"));

        store.clear();
        let err = builder.reauthorize(&mut request, &spec).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
    }

    proptest! {
        #[test]
        fn prop_query_values_roundtrip(values in proptest::collection::vec("\\PC{0,12}", 1..5)) {
            let mut spec = RequestSpec::get("foods/search").requires_auth(false);
            for (i, value) in values.iter().enumerate() {
                spec = spec.query(format!("k{i}"), value);
            }
            let request = builder_with(Arc::new(CredentialStore::in_memory()))
                .build(&spec)
                .unwrap();

            let decoded: Vec<(String, String)> = request
                .url()
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            prop_assert_eq!(decoded, spec.query_params().to_vec());
        }
    }
}
