//! Registration records and response bodies

use chrono::{DateTime, Utc};
use osis_uploads::FileMeta;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Review state of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    NeedsReview,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::NeedsReview => "needs_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Label shown to applicants
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Menunggu verifikasi",
            Self::NeedsReview => "Perlu ditinjau panitia",
            Self::Approved => "Diterima",
            Self::Rejected => "Ditolak",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted submission, before the store assigns a ticket
#[derive(Debug, Clone)]
pub struct NewRegistration {
    /// Sanitized text fields
    pub fields: Map<String, Value>,
    pub files: Vec<FileMeta>,
    /// Digits-only phone number, used for duplicate detection
    pub phone: String,
    pub status: RegistrationStatus,
    /// Field-rule failures kept for manual review
    pub review_notes: Vec<String>,
}

impl NewRegistration {
    pub fn new(fields: Map<String, Value>, files: Vec<FileMeta>) -> Self {
        let phone = fields
            .get("nomor_telepon")
            .and_then(Value::as_str)
            .map(normalize_phone)
            .unwrap_or_default();
        Self {
            fields,
            files,
            phone,
            status: RegistrationStatus::Pending,
            review_notes: Vec::new(),
        }
    }

    /// Mark for manual review with the given notes
    pub fn needs_review(mut self, notes: Vec<String>) -> Self {
        self.status = RegistrationStatus::NeedsReview;
        self.review_notes = notes;
        self
    }
}

/// Digits only, with the `62` country code folded into a leading `0`
pub fn normalize_phone(raw: &str) -> String {
    let digits = osis_validation::PhoneNumber::clean(raw);
    match digits.strip_prefix("62") {
        Some(rest) => format!("0{}", rest),
        None => digits,
    }
}

/// A stored registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub ticket: String,
    pub fields: Map<String, Value>,
    pub files: Vec<FileMeta>,
    pub phone: String,
    pub status: RegistrationStatus,
    pub assigned_division: Option<String>,
    pub rejection_reason: Option<String>,
    pub review_notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistrationRecord {
    pub fn from_new(ticket: String, registration: NewRegistration) -> Self {
        let now = Utc::now();
        Self {
            ticket,
            fields: registration.fields,
            files: registration.files,
            phone: registration.phone,
            status: registration.status,
            assigned_division: None,
            rejection_reason: None,
            review_notes: registration.review_notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// A text field as submitted
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Selected divisions, whether sent once or repeated
    pub fn divisions(&self) -> Vec<String> {
        match self.fields.get("divisi") {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Public view for status lookups
    pub fn view(&self) -> TicketView {
        TicketView {
            ticket: self.ticket.clone(),
            nama_lengkap: self.text("nama_lengkap").unwrap_or_default().to_string(),
            kelas: self.text("kelas").map(String::from),
            divisi: self.divisions(),
            status: self.status,
            status_label: self.status.label(),
            assigned_division: self.assigned_division.clone(),
            rejection_reason: self.rejection_reason.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// What an applicant sees for their ticket
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    pub ticket: String,
    pub nama_lengkap: String,
    pub kelas: Option<String>,
    pub divisi: Vec<String>,
    pub status: RegistrationStatus,
    pub status_label: &'static str,
    pub assigned_division: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Runtime-editable portal settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalSettings {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub group_link: Option<String>,
    /// Certificate size ceiling in MB, overriding the configured bytes
    pub max_file_size_mb: Option<u64>,
    pub registration_open: bool,
}

impl PortalSettings {
    pub fn new(registration_open: bool) -> Self {
        Self {
            registration_open,
            ..Self::default()
        }
    }

    pub fn view(&self) -> SettingsView {
        SettingsView {
            bot_token: self.bot_token.as_deref().map(mask_token),
            chat_id: self.chat_id.clone(),
            group_link: self.group_link.clone(),
            max_file_size: self.max_file_size_mb,
            registration_open: self.registration_open,
        }
    }
}

/// Settings as returned to admins, with the bot token masked
#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub group_link: Option<String>,
    pub max_file_size: Option<u64>,
    pub registration_open: bool,
}

fn mask_token(token: &str) -> String {
    match token.split_once(':') {
        Some((bot_id, _)) => format!("{}:****", bot_id),
        None => "****".to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub ticket: String,
    pub status: RegistrationStatus,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub success: bool,
    pub data: TicketView,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    pub ticket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RegistrationStatus>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub message: String,
    pub settings: SettingsView,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub registrations: usize,
    pub validation_mode: String,
}
