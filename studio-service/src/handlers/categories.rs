use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        category::{CreateCategoryRequest, UpdateCategoryRequest},
        ErrorResponse,
    },
    models::Category,
    utils::ValidatedJson,
    AppState,
};

#[utoipa::path(
    post,
    path = "/category",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Categories",
    security(("cookie_auth" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.db.create_category(&req).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/category",
    responses((status = 200, description = "All categories", body = [Category])),
    tag = "Categories",
    security(("cookie_auth" = []))
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.list_categories().await?))
}

#[utoipa::path(
    get,
    path = "/category/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "Categories",
    security(("cookie_auth" = []))
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.get_category(id).await?))
}

#[utoipa::path(
    patch,
    path = "/category/{id}",
    params(("id" = i64, Path, description = "Category id")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated category", body = Category),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "Categories",
    security(("cookie_auth" = []))
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.update_category(id, &req).await?))
}

#[utoipa::path(
    delete,
    path = "/category/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Deleted category", body = Category),
        (status = 400, description = "Category is used by jobs", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "Categories",
    security(("cookie_auth" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.delete_category(id).await?))
}
