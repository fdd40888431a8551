//! Profile endpoint

use crate::client::DietlogClient;
use crate::envelope::Payload;
use crate::error::ApiResult;
use crate::request::RequestSpec;
use serde::{Deserialize, Serialize};

/// Profile API interface
#[derive(Clone)]
pub struct ProfileApi {
    client: DietlogClient,
}

impl ProfileApi {
    pub(crate) fn new(client: DietlogClient) -> Self {
        Self { client }
    }

    /// Fetch the signed-in user's profile
    ///
    /// GET /users/me
    pub async fn fetch(&self) -> ApiResult<Profile> {
        self.client.execute(RequestSpec::get("users/me")).await
    }
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Daily calorie target in kcal
    #[serde(default)]
    pub daily_goal_kcal: Option<u32>,
    #[serde(default)]
    pub follower_count: u32,
    #[serde(default)]
    pub following_count: u32,
}

impl Payload for Profile {}
