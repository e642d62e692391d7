//! Public read endpoints.

use crate::error::{ApiError, ApiResult};
use crate::models::{HealthResponse, TicketResponse};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use osis_validation::{ValidationRequest, registration::ticket_lookup_rules};
use serde_json::json;
use tracing::warn;

/// `GET /api/ticket/:ticket`
pub async fn ticket_status(
    State(state): State<AppState>,
    Path(ticket): Path<String>,
) -> ApiResult<Json<TicketResponse>> {
    let ticket = ticket.trim();
    let report = ticket_lookup_rules().validate(&ValidationRequest::new().with("ticket", ticket));
    if !report.is_valid() {
        return Err(ApiError::validation(report));
    }

    let record = state
        .store
        .find(ticket)
        .await?
        .ok_or_else(|| ApiError::not_found("Tiket tidak ditemukan"))?;

    Ok(Json(TicketResponse {
        success: true,
        data: record.view(),
    }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registrations = match state.store.count().await {
        Ok(count) => count,
        Err(e) => {
            warn!(error = %e, "Registration count unavailable");
            0
        }
    };

    Json(HealthResponse {
        success: true,
        status: "ok",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        registrations,
        validation_mode: state.config.validation_mode.to_string(),
    })
}

pub async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Endpoint tidak ditemukan" })),
    )
}
