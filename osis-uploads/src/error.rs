//! Upload error types.

use thiserror::Error;

/// Result type for upload operations.
pub type Result<T> = std::result::Result<T, UploadError>;

/// Upload intake errors.
///
/// The display text of every variant is a fixed message that can be shown to
/// the applicant as-is.
#[derive(Debug, Error)]
pub enum UploadError {
    /// More file parts than allowed.
    #[error("Terlalu banyak file. Maksimal {max} file")]
    TooManyFiles {
        /// Maximum number of files.
        max: usize,
    },

    /// A file part arrived under a field name that does not accept files.
    #[error("Field file tidak dikenal: {0}")]
    UnexpectedField(String),

    /// A single file exceeded the intake ceiling.
    #[error("Ukuran file terlalu besar. Maksimal {} MB", .limit.div_ceil(1024 * 1024))]
    FileTooLarge {
        /// Field the file was sent under.
        field: String,
        /// Maximum allowed size in bytes.
        limit: u64,
    },

    /// The whole body exceeded the intake ceiling.
    #[error("Ukuran data terlalu besar")]
    PayloadTooLarge {
        /// Maximum allowed body size in bytes.
        limit: u64,
    },

    /// The request is not `multipart/form-data`.
    #[error("Permintaan harus berupa multipart/form-data")]
    InvalidContentType,

    /// Malformed multipart body.
    #[error("Format data upload tidak valid")]
    Multipart(String),
}

impl UploadError {
    /// Check if this is a size limit error.
    pub fn is_too_large(&self) -> bool {
        matches!(
            self,
            Self::FileTooLarge { .. } | Self::PayloadTooLarge { .. }
        )
    }

    /// Field the error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnexpectedField(field) | Self::FileTooLarge { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Convert to HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::FileTooLarge { .. } | Self::PayloadTooLarge { .. } => 413,
            Self::TooManyFiles { .. }
            | Self::UnexpectedField(_)
            | Self::InvalidContentType
            | Self::Multipart(_) => 400,
        }
    }
}

impl From<multer::Error> for UploadError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit } => Self::PayloadTooLarge { limit },
            multer::Error::FieldSizeExceeded { limit, field_name } => Self::FileTooLarge {
                field: field_name.unwrap_or_default(),
                limit,
            },
            multer::Error::NoMultipart
            | multer::Error::NoBoundary
            | multer::Error::DecodeContentType(_) => Self::InvalidContentType,
            other => Self::Multipart(other.to_string()),
        }
    }
}
