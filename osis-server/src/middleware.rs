//! Request middleware: rate limiting, admin auth and request logging.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use osis_ratelimit::{RateLimitCheckResponse, RateLimitMiddleware, RequestInfo};
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Registration budget, checked before the body is read.
pub async fn registration_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state.registration_limit, &state.config.trusted_proxies, request, next).await
}

/// General budget for the remaining API routes.
pub async fn api_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state.api_limit, &state.config.trusted_proxies, request, next).await
}

async fn enforce(
    limiter: &RateLimitMiddleware,
    trusted_proxies: &[IpAddr],
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let info = RequestInfo::from_parts(
        request.method(),
        request.uri().path(),
        request.headers(),
        peer,
        trusted_proxies,
    );

    match limiter.check(&info).await {
        RateLimitCheckResponse::Limited {
            headers, message, ..
        } => {
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "success": false, "message": message })),
            )
                .into_response();
            if let Some(headers) = headers {
                headers.apply(response.headers_mut());
            }
            response
        }
        RateLimitCheckResponse::Allowed { headers } => {
            let mut response = next.run(request).await;
            if let Some(headers) = headers {
                headers.apply(response.headers_mut());
            }
            response
        }
    }
}

/// Require `Authorization: Bearer <ADMIN_TOKEN>` when a token is configured.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.admin_token.as_deref() else {
        debug!("ADMIN_TOKEN not set, admin routes are open");
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => {
            warn!(path = %request.uri().path(), "Rejected admin request with wrong token");
            ApiError::Unauthorized("Token admin tidak valid".to_string()).into_response()
        }
        None => ApiError::Unauthorized("Token admin diperlukan".to_string()).into_response(),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Log method, path, status and latency of every request.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed().as_millis();
    let status = response.status().as_u16();
    info!("{method} {uri} {status} {elapsed}ms");

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"rahasia", b"rahasia"));
        assert!(!constant_time_eq(b"rahasia", b"rahasib"));
        assert!(!constant_time_eq(b"rahasia", b"rahasia!"));
    }
}
