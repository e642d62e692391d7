//! Client error types.

use osis_validation::ValidationReport;
use std::time::Duration;
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The form failed validation, locally or on the server.
    #[error("validation failed with {} errors", .0.error_count)]
    Validation(ValidationReport),

    /// An image attachment could not be compressed.
    #[error("image compression failed: {0}")]
    Compression(String),

    /// The submission did not finish in time.
    #[error("request timeout after {0:?}")]
    Timeout(Duration),

    /// The server could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The server rejected the request for sending too often.
    #[error("rate limit exceeded (too many requests)")]
    RateLimited {
        /// Message sent by the server.
        message: Option<String>,
        /// Seconds until the next attempt is allowed.
        retry_after: Option<u64>,
    },

    /// Any other non-success response.
    #[error("server error: http {status} {}", reason(.status))]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message sent by the server.
        message: Option<String>,
    },

    /// The response body was not what the portal sends.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The submission was cancelled by the caller.
    #[error("submission cancelled")]
    Cancelled,
}

fn reason(status: &u16) -> String {
    reqwest::StatusCode::from_u16(*status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
        .to_lowercase()
}

/// Keyword to user-facing message. The longest keyword found in the
/// lowercased error text wins.
const USER_MESSAGES: &[(&str, &str)] = &[
    (
        "timeout",
        "Waktu pengiriman habis. Periksa koneksi internet Anda lalu coba lagi.",
    ),
    (
        "network error",
        "Gagal terhubung ke server. Periksa koneksi internet Anda.",
    ),
    (
        "connection refused",
        "Server tidak dapat dihubungi. Coba beberapa saat lagi.",
    ),
    (
        "dns error",
        "Alamat server tidak ditemukan. Periksa koneksi internet Anda.",
    ),
    (
        "too many requests",
        "Terlalu banyak percobaan. Silakan tunggu sebelum mencoba lagi.",
    ),
    (
        "validation failed",
        "Data belum lengkap atau tidak valid. Periksa kembali formulir Anda.",
    ),
    (
        "image compression",
        "Gagal memproses gambar. Coba gunakan file gambar lain.",
    ),
    ("cancelled", "Pengiriman dibatalkan."),
    (
        "server error",
        "Terjadi kesalahan pada server. Silakan coba beberapa saat lagi.",
    ),
    (
        "http 403 forbidden",
        "Pendaftaran sedang ditutup.",
    ),
    (
        "http 404 not found",
        "Data tidak ditemukan.",
    ),
    (
        "http 409 conflict",
        "Nomor telepon sudah terdaftar. Gunakan nomor lain.",
    ),
    (
        "http 413 payload too large",
        "Ukuran file terlalu besar. Kecilkan file lalu coba lagi.",
    ),
    (
        "invalid response",
        "Respons server tidak dapat dibaca. Silakan coba lagi.",
    ),
];

/// Shown when no keyword matches.
pub const FALLBACK_MESSAGE: &str = "Terjadi kesalahan. Silakan coba lagi.";

/// Longest-keyword lookup over a free-form error text.
pub fn lookup_user_message(text: &str) -> &'static str {
    let text = text.to_lowercase();
    USER_MESSAGES
        .iter()
        .filter(|(keyword, _)| text.contains(keyword))
        .max_by_key(|(keyword, _)| keyword.len())
        .map(|(_, message)| *message)
        .unwrap_or(FALLBACK_MESSAGE)
}

impl ClientError {
    /// Localized message for the applicant.
    pub fn user_message(&self) -> &'static str {
        lookup_user_message(&self.to_string())
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Field errors, for validation failures.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Validation(report) => Some(report),
            _ => None,
        }
    }

    /// Map a transport failure, keeping the source chain in the message.
    pub(crate) fn transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            return Self::Timeout(timeout);
        }

        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Network(message)
    }
}
