//! Registration intake: `POST /api/register`.

use crate::error::{ApiError, ApiResult};
use crate::models::{NewRegistration, RegisterResponse, RegistrationStatus};
use crate::state::AppState;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
};
use osis_config::ValidationMode;
use osis_uploads::{FormData, UploadError, parse_multipart};
use osis_validation::{ValidationReport, ValidationRequest, registration::registration_rules};
use osis_xss::{XssDetector, XssSanitizer};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    if !state.registration_open() {
        return Err(ApiError::Forbidden("Pendaftaran sedang ditutup".to_string()));
    }

    let guard = state.upload_guard();
    let constraints = state.multipart_constraints(&guard);
    let content_type = headers
        .get(CONTENT_TYPE)
        .ok_or(UploadError::InvalidContentType)?;
    let form = parse_multipart(content_type, body.into_data_stream(), &constraints)?
        .collect_form(&constraints, &guard)
        .await?;

    let fields = sanitize_fields(&form);
    let request = ValidationRequest::from_json(&Value::Object(fields.clone()));
    let mut report = registration_rules().validate(&request);
    let upload_report = guard.report(&form.files);

    let mut registration = NewRegistration::new(
        fields,
        form.files.iter().map(|file| file.meta()).collect(),
    );

    if !report.is_valid() || !upload_report.is_valid() {
        let field_errors = report.error_count;
        let reviewable =
            state.config.validation_mode == ValidationMode::ManualReview && upload_report.is_valid();

        if !reviewable {
            report.merge(upload_report);
            info!(
                errors = report.error_count,
                fields = ?report.fields(),
                "Registration rejected"
            );
            return Err(ApiError::validation(report));
        }

        debug!(errors = field_errors, "Registration kept for manual review");
        registration = registration.needs_review(review_notes(&report));
    }

    let record = state.store.create(registration).await?;
    let message = match record.status {
        RegistrationStatus::NeedsReview => {
            "Pendaftaran diterima dan akan ditinjau panitia. Simpan nomor tiket Anda."
        }
        _ => "Pendaftaran berhasil! Simpan nomor tiket Anda.",
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: message.to_string(),
            ticket: record.ticket,
            status: record.status,
        }),
    ))
}

/// Strip dangerous markup from the text fields, logging what was found
fn sanitize_fields(form: &FormData) -> Map<String, Value> {
    let raw = form.to_json();
    for finding in XssDetector::scan_json(&raw) {
        warn!(
            field = %finding.path,
            attack = %finding.attack,
            "Dangerous markup removed from registration"
        );
    }

    match XssSanitizer::sanitize_json(&raw) {
        Value::Object(fields) => fields,
        _ => Map::new(),
    }
}

/// `field: message` lines in field order
fn review_notes(report: &ValidationReport) -> Vec<String> {
    report
        .fields()
        .into_iter()
        .flat_map(|field| {
            report
                .field(field)
                .unwrap_or_default()
                .iter()
                .map(move |message| format!("{}: {}", field, message))
        })
        .collect()
}
