use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::{
    models::CurrentUser,
    utils::{cookies::read_token, ACCESS_TOKEN_COOKIE},
    AppState,
};

/// Rejects the request with 401 unless it carries a valid access token for
/// an existing user. The `auth-token` cookie wins over `Authorization: Bearer`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(req.headers());
    let token = read_token(&jar, ACCESS_TOKEN_COOKIE).or_else(|| {
        req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    });

    let Some(token) = token else {
        return Err(AppError::AuthError(anyhow::anyhow!(
            "Missing authentication token"
        )));
    };

    let user = state.auth_service.resolve_access_token(&token).await?;

    req.extensions_mut().insert(AuthUser(user));
    Ok(next.run(req).await)
}

/// Identity attached by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub CurrentUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth identity missing from request extensions"
            ))
        })
    }
}
