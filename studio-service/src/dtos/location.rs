use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub address: String,
    pub coordinates: Option<String>,
    #[validate(range(min = 0))]
    pub displacement_rate: i32,
    pub free_site: bool,
    pub out_of_state: bool,
    pub out_of_country: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub address: Option<String>,
    pub coordinates: Option<String>,
    #[validate(range(min = 0))]
    pub displacement_rate: Option<i32>,
    pub free_site: Option<bool>,
    pub out_of_state: Option<bool>,
    pub out_of_country: Option<bool>,
}
