//! Food diary endpoints
//!
//! Both calls answer with the affected day's records so the caller can
//! replace its list wholesale.

use crate::client::DietlogClient;
use crate::error::{ApiError, ApiResult};
use crate::request::RequestSpec;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Diary API interface
#[derive(Clone)]
pub struct DiaryApi {
    client: DietlogClient,
}

impl DiaryApi {
    pub(crate) fn new(client: DietlogClient) -> Self {
        Self { client }
    }

    /// Log a food. Retries reuse one idempotency key.
    ///
    /// POST /diary/records
    pub async fn create_record(&self, record: &NewRecord) -> ApiResult<Vec<DiaryRecord>> {
        if !(record.quantity_g.is_finite() && record.quantity_g > 0.0) {
            return Err(ApiError::invalid_request("quantity_g must be a positive number"));
        }

        let spec = RequestSpec::post("diary/records").json(record)?.idempotent();
        self.client.execute(spec).await
    }

    /// Delete records by id
    ///
    /// DELETE /diary/records?ids=1,2,3
    pub async fn delete_items(&self, ids: &[i64]) -> ApiResult<Vec<DiaryRecord>> {
        if ids.is_empty() {
            return Err(ApiError::invalid_request("No record ids given"));
        }

        let ids = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        self.client
            .execute(RequestSpec::delete("diary/records").query("ids", ids))
            .await
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Meal slot a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// Payload for [`DiaryApi::create_record`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub food_id: i64,
    pub meal_type: MealType,
    /// Diary day, `YYYY-MM-DD`
    pub date: NaiveDate,
    pub quantity_g: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl NewRecord {
    pub fn new(food_id: i64, meal_type: MealType, date: NaiveDate, quantity_g: f64) -> Self {
        Self {
            food_id,
            meal_type,
            date,
            quantity_g,
            memo: None,
        }
    }

    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// A stored diary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryRecord {
    pub id: i64,
    pub food_id: i64,
    #[serde(default)]
    pub food_name: String,
    pub meal_type: MealType,
    pub date: NaiveDate,
    pub quantity_g: f64,
    #[serde(default)]
    pub kcal: f64,
    #[serde(default)]
    pub memo: Option<String>,
}
