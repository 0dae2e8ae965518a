pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    ip_rate_limit_middleware, make_request_span, request_id_middleware,
    security_headers_middleware, IpRateLimiter,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Environment, StudioConfig, SwaggerMode};
use crate::services::{AuthService, Database, JobPhotoService};
use crate::utils::{CookiePolicy, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::metrics::metrics,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh_token,
        handlers::auth::me,
        handlers::auth::profile,
        handlers::auth::logout,
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::categories::create_category,
        handlers::categories::list_categories,
        handlers::categories::get_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::locations::create_location,
        handlers::locations::list_locations,
        handlers::locations::get_location,
        handlers::locations::update_location,
        handlers::locations::delete_location,
        handlers::jobs::create_job,
        handlers::jobs::list_jobs,
        handlers::jobs::get_job,
        handlers::jobs::update_job,
        handlers::jobs::delete_job,
        handlers::photos::upload_photos,
        handlers::photos::list_photos,
        handlers::payments::create_payment,
        handlers::payments::list_payments,
        handlers::payments::get_payment,
        handlers::payments::update_payment,
        handlers::payments::delete_payment,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::LoginRequest,
            dtos::auth::SessionResponse,
            dtos::user::CreateUserRequest,
            dtos::user::UpdateUserRequest,
            dtos::category::CreateCategoryRequest,
            dtos::category::UpdateCategoryRequest,
            dtos::location::CreateLocationRequest,
            dtos::location::UpdateLocationRequest,
            dtos::job::CreateJobRequest,
            dtos::job::UpdateJobRequest,
            dtos::payment::CreatePaymentRequest,
            dtos::payment::UpdatePaymentRequest,
            handlers::photos::PhotoUploadForm,
            models::CurrentUser,
            models::UserResponse,
            models::Category,
            models::Location,
            models::Job,
            models::JobDetails,
            models::JobPhoto,
            models::Payment,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Sessions: login, refresh rotation, logout"),
        (name = "Users", description = "Customer and staff accounts"),
        (name = "Categories", description = "Bookable service categories"),
        (name = "Locations", description = "Venues and displacement rates"),
        (name = "Jobs", description = "Bookings and their photos"),
        (name = "Payments", description = "Payment plans"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(ACCESS_TOKEN_COOKIE))),
            );
            components.add_security_scheme(
                "refresh_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(REFRESH_TOKEN_COOKIE))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: StudioConfig,
    pub db: Database,
    pub auth_service: AuthService,
    pub photo_service: JobPhotoService,
    pub cookies: CookiePolicy,
    pub login_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

fn cors_layer(config: &StudioConfig) -> CorsLayer {
    // Credentialed CORS cannot fall back to `*`; unparsable origins are dropped.
    let origins: Vec<HeaderValue> = config
        .security
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let auth = from_fn_with_state(state.clone(), middleware::auth_middleware);

    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let protected = Router::new()
        .route("/auth/profile", get(handlers::auth::profile))
        .route(
            "/users/:id",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/category",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/category/:id",
            get(handlers::categories::get_category)
                .patch(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        .route(
            "/location",
            get(handlers::locations::list_locations).post(handlers::locations::create_location),
        )
        .route(
            "/location/:id",
            get(handlers::locations::get_location)
                .patch(handlers::locations::update_location)
                .delete(handlers::locations::delete_location),
        )
        .route(
            "/jobs",
            get(handlers::jobs::list_jobs).post(handlers::jobs::create_job),
        )
        .route(
            "/jobs/:id",
            get(handlers::jobs::get_job)
                .patch(handlers::jobs::update_job)
                .delete(handlers::jobs::delete_job),
        )
        .route(
            "/jobs/:id/photos",
            get(handlers::photos::list_photos)
                .post(handlers::photos::upload_photos)
                .layer(DefaultBodyLimit::max(state.config.photos.max_upload_bytes)),
        )
        .route(
            "/payment",
            get(handlers::payments::list_payments).post(handlers::payments::create_payment),
        )
        .route(
            "/payment/:id",
            get(handlers::payments::get_payment)
                .patch(handlers::payments::update_payment)
                .delete(handlers::payments::delete_payment),
        )
        .layer(auth.clone());

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    let swagger_enabled = match state.config.environment {
        Environment::Dev => true,
        Environment::Prod => state.config.swagger.enabled == SwaggerMode::Public,
    };

    if swagger_enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    let app = app
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/refresh-token", post(handlers::auth::refresh_token))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/logout", post(handlers::auth::logout))
        // Sign-up is public; listing users needs a session.
        .route(
            "/users",
            post(handlers::users::create_user).get(handlers::users::list_users.layer(auth)),
        )
        .merge(login_route)
        .merge(protected)
        .with_state(state.clone())
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(middleware::metrics_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    make_request_span(request)
                }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config));

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "PostgreSQL health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "postgres": "up"
        }
    })))
}
