//! Community feed endpoints
//!
//! Posts form a two-level tree: top-level posts and replies (a post with a
//! `parent_id`). Write actions carry an idempotency key so a retried
//! attempt is not applied twice.

use crate::client::DietlogClient;
use crate::envelope::{Page, Payload};
use crate::error::{ApiError, ApiResult};
use crate::request::RequestSpec;
use chrono::{DateTime, Utc};
use dietlog_core::timestamp;
use serde::{Deserialize, Serialize};

/// Longest post body the backend stores, in characters
pub const MAX_POST_CHARS: usize = 2000;

/// Community API interface
#[derive(Clone)]
pub struct CommunityApi {
    client: DietlogClient,
}

impl CommunityApi {
    pub(crate) fn new(client: DietlogClient) -> Self {
        Self { client }
    }

    /// Newest posts first
    ///
    /// GET /community/posts?page=&limit=
    pub async fn feed(&self, page: u32, limit: u32) -> ApiResult<Vec<Post>> {
        if page == 0 || limit == 0 {
            return Err(ApiError::invalid_request("page and limit must be at least 1"));
        }

        let spec = RequestSpec::get("community/posts")
            .query("page", page)
            .query("limit", limit);
        let page: Page<Post> = self.client.execute(spec).await?;
        Ok(page.into_items())
    }

    /// Like or unlike a post
    ///
    /// POST /community/posts/{id}/like
    pub async fn toggle_like(&self, post_id: i64, action: LikeAction) -> ApiResult<LikeState> {
        let spec = RequestSpec::post(format!("community/posts/{post_id}/like"))
            .json(&LikeRequest { action })?
            .idempotent();
        self.client.execute(spec).await
    }

    /// Publish a post, or a reply when `parent_id` is set.
    /// Returns the thread the new post belongs to.
    ///
    /// POST /community/posts
    pub async fn create_post(&self, content: &str, parent_id: Option<i64>) -> ApiResult<Vec<Post>> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::invalid_request("Post content is empty"));
        }
        if content.chars().count() > MAX_POST_CHARS {
            return Err(ApiError::invalid_request(format!(
                "Post content exceeds {MAX_POST_CHARS} characters"
            )));
        }

        let spec = RequestSpec::post("community/posts")
            .json(&NewPost { content, parent_id })?
            .idempotent();
        self.client.execute(spec).await
    }

    /// Delete one of the user's posts
    ///
    /// DELETE /community/posts/{id}
    pub async fn delete_post(&self, post_id: i64) -> ApiResult<Vec<Post>> {
        let spec = RequestSpec::delete(format!("community/posts/{post_id}")).idempotent();
        self.client.execute(spec).await
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Desired like state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Like,
    Unlike,
}

impl LikeAction {
    /// The action that flips the current state
    pub fn toggle(currently_liked: bool) -> Self {
        if currently_liked { Self::Unlike } else { Self::Like }
    }
}

#[derive(Debug, Serialize)]
struct LikeRequest {
    action: LikeAction,
}

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<i64>,
}

/// Like state after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub post_id: i64,
    pub liked: bool,
    #[serde(default)]
    pub like_count: u32,
}

impl Payload for LikeState {}

/// Who wrote a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A feed post with its replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub author: PostAuthor,
    pub content: String,
    #[serde(with = "timestamp::serde_lenient")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub replies: Vec<Post>,
}

impl Post {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::testing::{client, ok};
    use crate::error::ErrorKind;
    use crate::request::IDEMPOTENCY_KEY;
    use crate::transport::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn post_json(id: i64, parent_id: Option<i64>) -> serde_json::Value {
        json!({
            "id": id,
            "parent_id": parent_id,
            "author": {"user_id": 1, "nickname": "kim"},
            "content": "Salad for lunch",
            "created_at": "2026-03-14T12:30:00+0900",
            "like_count": 2
        })
    }

    #[test]
    fn test_like_action_toggle() {
        assert_eq!(LikeAction::toggle(true), LikeAction::Unlike);
        assert_eq!(LikeAction::toggle(false), LikeAction::Like);
    }

    #[tokio::test]
    async fn test_toggle_like() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, &ok(json!({"post_id": 9, "liked": true, "like_count": 3})));

        let state = client(&transport, true)
            .community()
            .toggle_like(9, LikeAction::Like)
            .await
            .unwrap();
        assert!(state.liked);
        assert_eq!(state.like_count, 3);

        let sent = &transport.requests()[0];
        assert_eq!(sent.request.url().path(), "/v1/community/posts/9/like");
        assert!(sent.header(IDEMPOTENCY_KEY).is_some());
        let body: serde_json::Value = serde_json::from_slice(sent.request.body().unwrap()).unwrap();
        assert_eq!(body, json!({"action": "like"}));
    }

    #[tokio::test]
    async fn test_create_reply_returns_thread() {
        let mut parent = post_json(1, None);
        parent["replies"] = json!([post_json(2, Some(1))]);

        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, &ok(json!([parent])));

        let thread = client(&transport, true)
            .community()
            .create_post("  Looks great  ", Some(1))
            .await
            .unwrap();
        assert_eq!(thread.len(), 1);
        assert!(thread[0].replies[0].is_reply());

        let body: serde_json::Value =
            serde_json::from_slice(transport.requests()[0].request.body().unwrap()).unwrap();
        assert_eq!(body, json!({"content": "Looks great", "parent_id": 1}));
    }

    #[tokio::test]
    async fn test_top_level_post_omits_parent() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, &ok(json!([post_json(5, None)])));

        client(&transport, true)
            .community()
            .create_post("Hello", None)
            .await
            .unwrap();

        let body: serde_json::Value =
            serde_json::from_slice(transport.requests()[0].request.body().unwrap()).unwrap();
        assert!(body.get("parent_id").is_none());
    }

    #[tokio::test]
    async fn test_post_content_is_validated() {
        let transport = Arc::new(MockTransport::new());
        let community = client(&transport, true).community();

        let err = community.create_post("   ", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRequest);

        let long = "a".repeat(MAX_POST_CHARS + 1);
        assert!(community.create_post(&long, None).await.is_err());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_post() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, &json!({"success": true, "data": null, "request_id": "r"}));

        let remaining = client(&transport, true).community().delete_post(5).await.unwrap();
        assert!(remaining.is_empty());

        let sent = &transport.requests()[0];
        assert_eq!(sent.request.method(), reqwest::Method::DELETE);
        assert_eq!(sent.request.url().path(), "/v1/community/posts/5");
    }

    #[tokio::test]
    async fn test_feed() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, &ok(json!({"list": [post_json(1, None)], "total": 40})));

        let posts = client(&transport, true).community().feed(1, 20).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author.nickname, "kim");
        assert_eq!(
            transport.requests()[0].request.url().query(),
            Some("page=1&limit=20")
        );
    }
}
