use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{LoginRequest, RegisterRequest, SessionResponse},
        ErrorResponse, MessageResponse,
    },
    middleware::AuthUser,
    models::{CurrentUser, UserResponse},
    utils::{cookies::read_token, ValidatedJson, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    AppState,
};

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth_service
        .register(req.name, req.email, req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

/// Login with email and password; sets both session cookies
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many login attempts", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (_, tokens) = state
        .auth_service
        .authenticate(&req.email, &req.password)
        .await?;

    Ok((
        state.cookies.attach(jar, &tokens),
        Json(SessionResponse::success("Login successful")),
    ))
}

/// Rotate the refresh-token cookie and issue a new access token
#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    responses(
        (status = 200, description = "Session refreshed", body = SessionResponse),
        (status = 401, description = "Missing, invalid or reused refresh token", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("refresh_cookie" = []))
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let presented = read_token(&jar, REFRESH_TOKEN_COOKIE);
    let tokens = state.auth_service.refresh(presented.as_deref()).await?;

    Ok((
        state.cookies.attach(jar, &tokens),
        Json(SessionResponse::success("Token refreshed")),
    ))
}

/// Current identity, re-verified from the access-token cookie
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = CurrentUser),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("cookie_auth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<CurrentUser>, AppError> {
    let token = read_token(&jar, ACCESS_TOKEN_COOKIE);
    let user = state.auth_service.current_user(token.as_deref()).await?;
    Ok(Json(user))
}

/// Identity attached by the request authenticator
#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Current user", body = CurrentUser),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
pub async fn profile(AuthUser(user): AuthUser) -> Json<CurrentUser> {
    Json(user)
}

/// Clear both session cookies and revoke the refresh token when possible
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let presented = read_token(&jar, REFRESH_TOKEN_COOKIE);
    state.auth_service.logout(presented.as_deref()).await;

    (
        state.cookies.clear(jar),
        Json(MessageResponse::new("Logged out successfully")),
    )
}
