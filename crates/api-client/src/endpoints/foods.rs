//! Food search endpoint
//!
//! Whether search sends the bearer token follows
//! [`ClientConfig::search_requires_auth`](crate::config::ClientConfig::search_requires_auth).

use crate::client::DietlogClient;
use crate::envelope::Page;
use crate::error::{ApiError, ApiResult};
use crate::request::RequestSpec;
use serde::{Deserialize, Serialize};

/// Largest page size the backend accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Foods API interface
#[derive(Clone)]
pub struct FoodsApi {
    client: DietlogClient,
}

impl FoodsApi {
    pub(crate) fn new(client: DietlogClient) -> Self {
        Self { client }
    }

    /// Search the food database. A missing result list means no matches.
    ///
    /// GET /foods/search?keyword=&page=&limit=
    pub async fn search(&self, keyword: &str, page: u32, limit: u32) -> ApiResult<Vec<FoodItem>> {
        Ok(self.search_page(keyword, page, limit).await?.into_items())
    }

    /// Like [`search`](Self::search), keeping the total match count
    pub async fn search_page(&self, keyword: &str, page: u32, limit: u32) -> ApiResult<Page<FoodItem>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ApiError::invalid_request("Search keyword is empty"));
        }
        if page == 0 {
            return Err(ApiError::invalid_request("Pages start at 1"));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ApiError::invalid_request(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let spec = RequestSpec::get("foods/search")
            .query("keyword", keyword)
            .query("page", page)
            .query("limit", limit)
            .requires_auth(self.client.config().search_requires_auth);
        self.client.execute(spec).await
    }
}

/// One food database entry. Nutrients are per `serving_grams`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub serving_grams: f64,
    #[serde(default)]
    pub kcal: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub fat_g: f64,
}
