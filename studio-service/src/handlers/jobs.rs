use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        job::{CreateJobRequest, UpdateJobRequest},
        ErrorResponse,
    },
    models::JobDetails,
    utils::ValidatedJson,
    AppState,
};

/// Book a job. Customer, categories and locations must all exist.
#[utoipa::path(
    post,
    path = "/jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created", body = JobDetails),
        (status = 404, description = "Referenced customer, category or location not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Jobs",
    security(("cookie_auth" = []))
)]
pub async fn create_job(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateJobRequest>,
) -> Result<impl IntoResponse, AppError> {
    let job = state.db.create_job(&req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(
    get,
    path = "/jobs",
    responses((status = 200, description = "All jobs with customer, categories and locations", body = [JobDetails])),
    tag = "Jobs",
    security(("cookie_auth" = []))
)]
pub async fn list_jobs(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.list_jobs().await?))
}

#[utoipa::path(
    get,
    path = "/jobs/{id}",
    params(("id" = i64, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job", body = JobDetails),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    tag = "Jobs",
    security(("cookie_auth" = []))
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.get_job(id).await?))
}

/// Partial update. `categoryIds` / `locationIds`, when present, replace the current links.
#[utoipa::path(
    patch,
    path = "/jobs/{id}",
    params(("id" = i64, Path, description = "Job id")),
    request_body = UpdateJobRequest,
    responses(
        (status = 200, description = "Updated job", body = JobDetails),
        (status = 404, description = "Job or referenced entity not found", body = ErrorResponse)
    ),
    tag = "Jobs",
    security(("cookie_auth" = []))
)]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateJobRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.update_job(id, &req).await?))
}

#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    params(("id" = i64, Path, description = "Job id")),
    responses(
        (status = 200, description = "Deleted job", body = JobDetails),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    tag = "Jobs",
    security(("cookie_auth" = []))
)]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.delete_job(id).await?))
}
