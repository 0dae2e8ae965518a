use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{Category, Location, UserResponse};

/// Booking row. Category and location links live in join tables.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub customer_id: i64,
    pub payment: String,
    pub photos: Option<String>,
    pub customer_link: Option<String>,
    pub discount: Option<i32>,
    pub closing_date: Option<DateTime<Utc>>,
    pub event_date: Option<DateTime<Utc>>,
    pub gift: Option<bool>,
    pub created_utc: DateTime<Utc>,
}

/// A job with its customer, categories and locations resolved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    #[serde(flatten)]
    pub job: Job,
    pub customer: UserResponse,
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}
