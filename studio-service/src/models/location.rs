use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub coordinates: Option<String>,
    pub displacement_rate: i32,
    pub free_site: bool,
    pub out_of_state: bool,
    pub out_of_country: bool,
    pub created_utc: DateTime<Utc>,
}
