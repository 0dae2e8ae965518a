use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        payment::{CreatePaymentRequest, UpdatePaymentRequest},
        ErrorResponse,
    },
    models::Payment,
    utils::ValidatedJson,
    AppState,
};

#[utoipa::path(
    post,
    path = "/payment",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment created", body = Payment),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("cookie_auth" = []))
)]
pub async fn create_payment(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payment = state.db.create_payment(&req).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    get,
    path = "/payment",
    responses((status = 200, description = "All payments, oldest first", body = [Payment])),
    tag = "Payments",
    security(("cookie_auth" = []))
)]
pub async fn list_payments(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.list_payments().await?))
}

#[utoipa::path(
    get,
    path = "/payment/{id}",
    params(("id" = i64, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment", body = Payment),
        (status = 404, description = "Payment not found", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("cookie_auth" = []))
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.get_payment(id).await?))
}

/// Partial update; always bumps `updatedUtc`
#[utoipa::path(
    patch,
    path = "/payment/{id}",
    params(("id" = i64, Path, description = "Payment id")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Updated payment", body = Payment),
        (status = 404, description = "Payment not found", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("cookie_auth" = []))
)]
pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.update_payment(id, &req).await?))
}

#[utoipa::path(
    delete,
    path = "/payment/{id}",
    params(("id" = i64, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Deleted payment", body = Payment),
        (status = 404, description = "Payment not found", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("cookie_auth" = []))
)]
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.delete_payment(id).await?))
}
