//! Session API client for the Dietlog backend
//!
//! Builds authenticated requests, retries when rate limited, decodes the
//! backend's `{success, data, request_id, message}` envelope into typed
//! results and keeps the session credential in one shared store.
//!
//! # Features
//!
//! - **Credential store**: token, expiry and device id behind one lock,
//!   persisted through a [`KeyValueStore`](dietlog_core::storage::KeyValueStore)
//! - **Rate-limit retry**: up to 3 attempts, `2s + U(0,1)s` apart
//! - **Session invalidation**: a 401 clears the stored credential
//! - **Request correlation**: one `X-Request-ID` per call, kept across retries
//! - **Idempotency keys**: on write actions, kept across retries
//!
//! # Example
//!
//! ```rust,no_run
//! use dietlog_api_client::{ClientConfig, DietlogClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DietlogClient::with_config(ClientConfig::load()?)?;
//!
//!     client.auth().sign_in("code-from-login-flow").await?;
//!     let profile = client.profile().fetch().await?;
//!     println!("Signed in as {}", profile.nickname);
//!
//!     let foods = client.foods().search("apple", 1, 20).await?;
//!     println!("Found {} foods", foods.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod policy;
pub mod request;
pub mod transport;

pub use client::{spawn, CallHandle, DietlogClient};
pub use config::{ClientConfig, Environment};
pub use credentials::{Credential, CredentialStore};
pub use envelope::{Envelope, Page, Payload};
pub use error::{ApiError, ApiResult, ErrorKind};
pub use policy::RetryPolicy;
pub use request::RequestSpec;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::{spawn, CallHandle, DietlogClient};
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::credentials::{Credential, CredentialStore};
    pub use crate::endpoints::{AuthApi, CommunityApi, DiaryApi, FoodsApi, ProfileApi};
    pub use crate::endpoints::community::{LikeAction, LikeState, Post};
    pub use crate::endpoints::diary::{DiaryRecord, MealType, NewRecord};
    pub use crate::endpoints::foods::FoodItem;
    pub use crate::endpoints::profile::Profile;
    pub use crate::error::{ApiError, ApiResult, ErrorKind};
}
