//! Sign-in endpoints
//!
//! `POST auth/token` exchanges a one-time sign-in code (from the platform
//! login flow) for a bearer token. It is the only call that never sends
//! `Authorization`.

use crate::client::DietlogClient;
use crate::credentials::Credential;
use crate::envelope::Payload;
use crate::error::{ApiError, ApiResult};
use crate::request::RequestSpec;
use chrono::{DateTime, Utc};
use dietlog_core::timestamp;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Auth API interface
#[derive(Clone)]
pub struct AuthApi {
    client: DietlogClient,
}

impl AuthApi {
    pub(crate) fn new(client: DietlogClient) -> Self {
        Self { client }
    }

    /// Exchange a sign-in code for a session.
    ///
    /// POST /auth/token
    ///
    /// The credential store is not touched; call
    /// [`CredentialStore::save`](crate::credentials::CredentialStore::save)
    /// with [`AuthSession::credential`] on success, or use
    /// [`sign_in`](Self::sign_in).
    pub async fn authenticate(&self, auth_code: &str, device_id: &str) -> ApiResult<AuthSession> {
        if auth_code.trim().is_empty() {
            return Err(ApiError::invalid_request("Sign-in code is empty"));
        }

        let spec = RequestSpec::post("auth/token")
            .requires_auth(false)
            .json(&TokenRequest {
                auth_code,
                device_id,
            })?;
        self.client.execute(spec).await
    }

    /// Authenticate with this installation's device id and store the result
    pub async fn sign_in(&self, auth_code: &str) -> ApiResult<AuthSession> {
        let credentials = self.client.credentials();
        let device_id = credentials.device_id();

        let session = self.authenticate(auth_code, &device_id).await?;
        credentials.save(session.credential(device_id));
        info!(user_id = session.user_id, new_user = session.is_new_user, "Signed in");
        Ok(session)
    }

    /// Forget the stored credential. No request is made.
    pub fn logout(&self) {
        self.client.credentials().clear();
        info!("Signed out");
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    auth_code: &'a str,
    device_id: &'a str,
}

/// Result of a successful code exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(rename = "expired_at", with = "timestamp::serde_lenient")]
    pub expires_at: DateTime<Utc>,
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// First sign-in for this account
    #[serde(default)]
    pub is_new_user: bool,
}

impl AuthSession {
    /// Credential to store for this session
    pub fn credential(&self, device_id: impl Into<String>) -> Credential {
        Credential::new(self.access_token.clone(), self.expires_at, device_id)
    }
}

impl Payload for AuthSession {}
