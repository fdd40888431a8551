//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for one area of the Dietlog
//! backend. All of them go through [`DietlogClient::execute`](crate::DietlogClient::execute),
//! so auth, retries and envelope decoding behave the same everywhere.
//!
//! | Module | Paths | Description |
//! |--------|-------|-------------|
//! | `auth` | `auth/token` | Exchange a sign-in code for a session |
//! | `profile` | `users/me` | Current user profile |
//! | `foods` | `foods/search` | Food database search |
//! | `diary` | `diary/records` | Food diary records |
//! | `community` | `community/posts` | Feed, posts, replies and likes |

pub mod auth;
pub mod community;
pub mod diary;
pub mod foods;
pub mod profile;

pub use auth::AuthApi;
pub use community::CommunityApi;
pub use diary::DiaryApi;
pub use foods::FoodsApi;
pub use profile::ProfileApi;

#[cfg(test)]
pub(crate) mod testing {
    use crate::client::DietlogClient;
    use crate::config::ClientConfig;
    use crate::credentials::{Credential, CredentialStore};
    use crate::transport::MockTransport;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;

    /// Client over `transport`, optionally holding a valid "tok" credential
    pub fn client(transport: &Arc<MockTransport>, signed_in: bool) -> DietlogClient {
        let credentials = Arc::new(CredentialStore::in_memory());
        if signed_in {
            credentials.save(Credential::new("tok", Utc::now() + Duration::hours(1), "dev"));
        }
        DietlogClient::with_parts(
            ClientConfig::default().with_base_url("https://api.example.test/v1"),
            credentials,
            Arc::clone(transport) as Arc<dyn crate::transport::Transport>,
        )
    }

    pub fn ok(data: Value) -> Value {
        json!({"success": true, "data": data, "request_id": "req-test"})
    }
}
