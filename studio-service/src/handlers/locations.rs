use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        location::{CreateLocationRequest, UpdateLocationRequest},
        ErrorResponse,
    },
    models::Location,
    utils::ValidatedJson,
    AppState,
};

#[utoipa::path(
    post,
    path = "/location",
    request_body = CreateLocationRequest,
    responses(
        (status = 201, description = "Location created", body = Location),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Locations",
    security(("cookie_auth" = []))
)]
pub async fn create_location(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateLocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let location = state.db.create_location(&req).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

#[utoipa::path(
    get,
    path = "/location",
    responses((status = 200, description = "All locations", body = [Location])),
    tag = "Locations",
    security(("cookie_auth" = []))
)]
pub async fn list_locations(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.list_locations().await?))
}

#[utoipa::path(
    get,
    path = "/location/{id}",
    params(("id" = i64, Path, description = "Location id")),
    responses(
        (status = 200, description = "Location", body = Location),
        (status = 404, description = "Location not found", body = ErrorResponse)
    ),
    tag = "Locations",
    security(("cookie_auth" = []))
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.get_location(id).await?))
}

#[utoipa::path(
    patch,
    path = "/location/{id}",
    params(("id" = i64, Path, description = "Location id")),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Updated location", body = Location),
        (status = 404, description = "Location not found", body = ErrorResponse)
    ),
    tag = "Locations",
    security(("cookie_auth" = []))
)]
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateLocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.update_location(id, &req).await?))
}

#[utoipa::path(
    delete,
    path = "/location/{id}",
    params(("id" = i64, Path, description = "Location id")),
    responses(
        (status = 200, description = "Deleted location", body = Location),
        (status = 400, description = "Location is used by jobs", body = ErrorResponse),
        (status = 404, description = "Location not found", body = ErrorResponse)
    ),
    tag = "Locations",
    security(("cookie_auth" = []))
)]
pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.delete_location(id).await?))
}
