//! HTTP boundary for the OSIS registration portal
//!
//! Builds the axum [`Router`] that strings the portal pipeline together:
//! rate limiting runs first, then the body is parsed, sanitized, validated
//! and guarded before anything reaches the [`RegistrationStore`].
//!
//! | Route | Budget | Notes |
//! |---|---|---|
//! | `POST /api/register` | registration | multipart form |
//! | `GET /api/ticket/:ticket` | general | status lookup |
//! | `POST /api/admin/action` | general | bearer token |
//! | `GET`/`PUT /api/admin/settings` | general | bearer token |
//! | `GET /health` | none | |
//!
//! ```no_run
//! use osis_config::PortalConfig;
//! use osis_server::{AppState, app};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(PortalConfig::default())?;
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod register;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod ticket;

pub use error::{ApiError, ApiResult};
pub use models::{PortalSettings, RegistrationRecord, RegistrationStatus};
pub use state::AppState;
pub use store::{InMemoryRegistrationStore, RegistrationStore, ReviewDecision, StoreError};

use axum::{
    Json, Router,
    http::{HeaderName, Method, StatusCode, header},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

/// Build the portal router.
pub fn app(state: AppState) -> Router {
    let register = Router::new()
        .route("/api/register", post(register::register))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::registration_rate_limit,
        ));

    let admin = Router::new()
        .route("/api/admin/action", post(admin::review_action))
        .route(
            "/api/admin/settings",
            get(admin::get_settings).put(admin::update_settings),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_admin));

    let api = Router::new()
        .route("/api/ticket/:ticket", get(handlers::ticket_status))
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), middleware::api_rate_limit));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(register)
        .merge(api)
        .fallback(handlers::route_not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(middleware::request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderName::from_static("x-ratelimit-reset"),
            header::RETRY_AFTER,
        ])
}

/// Generic 500 body for a panicking handler.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "message": error::INTERNAL_ERROR_MESSAGE })),
    )
        .into_response()
}
