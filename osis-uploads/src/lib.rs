//! # OSIS Uploads
//!
//! Multipart intake and file checks for the registration form.
//!
//! ## Features
//!
//! - **Multipart intake** - text fields become a JSON object, file parts are
//!   read with a per-file ceiling, a file count limit and an allowed field list
//! - **Upload guard** - per-class extension and size rules (the applicant
//!   photo and certificates carry different limits), reported as validation
//!   errors grouped by field
//!
//! ## Quick Start
//!
//! ```rust
//! use osis_uploads::{UploadGuard, UploadedFile, CERTIFICATE_EXTENSIONS};
//!
//! const MB: u64 = 1024 * 1024;
//! let guard = UploadGuard::registration(2 * MB, 5 * MB, CERTIFICATE_EXTENSIONS);
//!
//! let files = vec![UploadedFile::from_bytes("sertifikat_1", "juara.pdf", vec![1u8; 64])];
//! let report = guard.report(&files);
//! assert_eq!(report.field("foto"), Some(&["Foto wajib diunggah".to_string()][..]));
//! ```

mod error;
mod file;
mod guard;
mod multipart;

pub use error::{Result, UploadError};
pub use file::{FileMeta, UploadedFile};
pub use guard::{CERTIFICATE_EXTENSIONS, FieldMatcher, FileClass, PHOTO_EXTENSIONS, UploadGuard};
pub use multipart::{FormData, Multipart, MultipartConstraints, parse_multipart};

/// Render a byte count the way limits are shown to applicants.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{} MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} byte", bytes)
    }
}
