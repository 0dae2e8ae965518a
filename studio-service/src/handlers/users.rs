use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        user::{CreateUserRequest, UpdateUserRequest},
        ErrorResponse,
    },
    models::UserResponse,
    services::UserChanges,
    utils::{hash_password, Password, ValidatedJson},
    AppState,
};

/// Create a user (public; accounts start without admin rights, see `PATCH /users/{id}`)
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth_service
        .register(req.name, req.email, req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All users", body = [UserResponse])),
    tag = "Users",
    security(("cookie_auth" = []))
)]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<UserResponse> = state
        .db
        .list_users()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("cookie_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.get_user(id).await?.sanitized()))
}

/// Partial update; a new password is re-hashed before storage
#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "Users",
    security(("cookie_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password_hash = match req.password {
        Some(password) => Some(hash_password(&Password::new(password))?.into_string()),
        None => None,
    };

    let user = state
        .db
        .update_user(
            id,
            UserChanges {
                name: req.name,
                email: req.email,
                password_hash,
                admin: req.admin,
            },
        )
        .await?;

    tracing::info!(user_id = id, "User updated");
    Ok(Json(user.sanitized()))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Deleted user", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("cookie_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.db.delete_user(id).await?;
    tracing::info!(user_id = id, "User deleted");
    Ok(Json(user.sanitized()))
}
