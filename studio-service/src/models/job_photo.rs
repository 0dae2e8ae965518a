use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobPhoto {
    pub id: i64,
    pub job_id: i64,
    pub photo_key: String,
    pub created_utc: DateTime<Utc>,
}
