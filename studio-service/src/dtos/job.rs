use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub customer_id: i64,
    #[validate(length(min = 1, message = "At least one category is required"))]
    pub category_ids: Vec<i64>,
    pub location_ids: Option<Vec<i64>>,
    #[validate(length(min = 1))]
    pub payment: String,
    pub photos: Option<String>,
    pub customer_link: Option<String>,
    #[validate(range(min = 0))]
    pub discount: Option<i32>,
    pub closing_date: Option<DateTime<Utc>>,
    pub event_date: Option<DateTime<Utc>>,
    pub gift: Option<bool>,
}

/// Partial job update. Present `categoryIds`/`locationIds` replace the
/// existing links wholesale.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub customer_id: Option<i64>,
    #[validate(length(min = 1))]
    pub category_ids: Option<Vec<i64>>,
    pub location_ids: Option<Vec<i64>>,
    #[validate(length(min = 1))]
    pub payment: Option<String>,
    pub photos: Option<String>,
    pub customer_link: Option<String>,
    #[validate(range(min = 0))]
    pub discount: Option<i32>,
    pub closing_date: Option<DateTime<Utc>>,
    pub event_date: Option<DateTime<Utc>>,
    pub gift: Option<bool>,
}
