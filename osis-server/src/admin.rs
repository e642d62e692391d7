//! Admin endpoints: review actions and portal settings.

use crate::error::{ApiError, ApiResult};
use crate::models::{ActionResponse, SettingsResponse};
use crate::state::AppState;
use crate::store::ReviewDecision;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use osis_validation::{
    IsBoolean, RuleSet, ValidationRequest,
    registration::{admin_action_rules, settings_rules},
};
use osis_xss::XssSanitizer;
use serde_json::Value;
use tracing::info;

/// Parse, sanitize and validate a JSON admin body
fn admin_request(
    payload: Result<Json<Value>, JsonRejection>,
    rules: RuleSet,
) -> ApiResult<ValidationRequest> {
    let Json(payload) = payload
        .map_err(|e| ApiError::bad_request(format!("Body JSON tidak valid: {}", e.body_text())))?;
    let request = ValidationRequest::from_json(&XssSanitizer::sanitize_json(&payload));

    let report = rules.validate(&request);
    if !report.is_valid() {
        return Err(ApiError::validation(report));
    }
    Ok(request)
}

/// `POST /api/admin/action`
pub async fn review_action(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ActionResponse>> {
    let request = admin_request(payload, admin_action_rules())?;
    let ticket = request.text("ticket").unwrap_or_default().trim().to_string();
    let action = request.text("action").unwrap_or_default();

    let decision = match action {
        "approve" => ReviewDecision::Approve {
            division: request.text("divisi").unwrap_or_default().to_string(),
        },
        "reject" => ReviewDecision::Reject {
            reason: request.text("reason").unwrap_or_default().trim().to_string(),
        },
        "delete" => {
            state.store.delete(&ticket).await?;
            info!(ticket = %ticket, "Admin deleted registration");
            return Ok(Json(ActionResponse {
                success: true,
                message: format!("Pendaftaran {} dihapus", ticket),
                ticket,
                status: None,
            }));
        }
        other => return Err(ApiError::bad_request(format!("Aksi tidak dikenal: {}", other))),
    };

    let record = state.store.review(&ticket, decision).await?;
    let message = match &record.assigned_division {
        Some(division) => format!("Pendaftaran {} diterima di divisi {}", ticket, division),
        None => format!("Pendaftaran {} ditolak", ticket),
    };
    info!(ticket = %ticket, action, "Admin reviewed registration");

    Ok(Json(ActionResponse {
        success: true,
        message,
        ticket,
        status: Some(record.status),
    }))
}

/// `GET /api/admin/settings`
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        success: true,
        message: "Pengaturan saat ini".to_string(),
        settings: state.settings.read().view(),
    })
}

/// `PUT /api/admin/settings`: only the fields sent are changed
pub async fn update_settings(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<SettingsResponse>> {
    let request = admin_request(payload, settings_rules())?;

    let view = {
        let mut settings = state.settings.write();
        if let Some(token) = request.text("bot_token") {
            settings.bot_token = Some(token.trim().to_string());
        }
        if let Some(chat_id) = request.text("chat_id") {
            settings.chat_id = Some(chat_id.trim().to_string());
        }
        if let Some(link) = request.text("group_link") {
            settings.group_link = Some(link.trim().to_string());
        }
        if let Some(mb) = request
            .text("max_file_size")
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            settings.max_file_size_mb = Some(mb);
        }
        if let Some(open) = request.text("registration_open").and_then(IsBoolean::parse) {
            settings.registration_open = open;
        }
        settings.view()
    };

    info!(
        registration_open = view.registration_open,
        max_file_size = ?view.max_file_size,
        "Portal settings updated"
    );

    Ok(Json(SettingsResponse {
        success: true,
        message: "Pengaturan berhasil disimpan".to_string(),
        settings: view,
    }))
}
