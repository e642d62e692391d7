//! Upload guard.
//!
//! Every uploaded file is matched to a [`FileClass`] by its form field name
//! and checked against that class's extension list and size ceiling. All
//! violations are collected; nothing short-circuits.

use osis_validation::{ValidationError, ValidationReport};
use tracing::debug;

use crate::{UploadedFile, format_size};

/// Extensions accepted for the applicant photo.
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Extensions accepted for certificates by default.
pub const CERTIFICATE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "pdf"];

/// How a file class selects form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatcher {
    /// Field name must be exactly this.
    Exact(String),
    /// Field name must start with this.
    Prefix(String),
}

impl FieldMatcher {
    /// Check a form field name.
    pub fn matches(&self, field: &str) -> bool {
        match self {
            Self::Exact(name) => field == name,
            Self::Prefix(prefix) => field.starts_with(prefix.as_str()),
        }
    }
}

/// Limits for one kind of upload.
#[derive(Debug, Clone)]
pub struct FileClass {
    /// Field selection.
    pub matcher: FieldMatcher,
    /// Name used in messages.
    pub label: String,
    /// Whether at least one file is required.
    pub required: bool,
    /// Whether more than one file may be sent.
    pub multiple: bool,
    /// Maximum size in bytes, inclusive.
    pub max_size: u64,
    /// Allowed lowercase extensions.
    pub allowed_extensions: Vec<String>,
}

impl FileClass {
    /// A class for a single named field.
    pub fn exact(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            matcher: FieldMatcher::Exact(field.into()),
            label: label.into(),
            required: false,
            multiple: false,
            max_size: u64::MAX,
            allowed_extensions: Vec::new(),
        }
    }

    /// A class for every field sharing a prefix.
    pub fn prefixed(prefix: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            matcher: FieldMatcher::Prefix(prefix.into()),
            label: label.into(),
            required: false,
            multiple: true,
            max_size: u64::MAX,
            allowed_extensions: Vec::new(),
        }
    }

    /// Required applicant photo under `foto`.
    pub fn photo(max_size: u64) -> Self {
        Self::exact("foto", "Foto")
            .required(true)
            .max_size(max_size)
            .extensions(PHOTO_EXTENSIONS)
    }

    /// Optional certificates under `sertifikat*`.
    pub fn certificate(max_size: u64, extensions: &[&str]) -> Self {
        Self::prefixed("sertifikat", "Sertifikat")
            .max_size(max_size)
            .extensions(extensions)
    }

    /// Set whether the class is required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set whether several files may be sent.
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Set the maximum size.
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Set allowed file extensions.
    pub fn extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.allowed_extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Field name used when reporting a missing file.
    fn report_field(&self) -> &str {
        match &self.matcher {
            FieldMatcher::Exact(name) | FieldMatcher::Prefix(name) => name,
        }
    }

    fn check_file(&self, file: &UploadedFile, errors: &mut Vec<ValidationError>) {
        if file.is_empty() {
            errors.push(
                ValidationError::new(&file.field, format!("File {} kosong", self.label))
                    .with_constraint("not_empty")
                    .with_value(&file.name),
            );
            return;
        }

        if !self.allowed_extensions.is_empty() {
            let allowed = file
                .extension_lowercase()
                .is_some_and(|ext| self.allowed_extensions.contains(&ext));
            if !allowed {
                let list = self
                    .allowed_extensions
                    .iter()
                    .map(|e| e.to_uppercase())
                    .collect::<Vec<_>>()
                    .join(", ");
                errors.push(
                    ValidationError::new(
                        &file.field,
                        format!("Format {} harus {}", self.label, list),
                    )
                    .with_constraint("extension")
                    .with_value(&file.name),
                );
            }
        }

        if file.size > self.max_size {
            errors.push(
                ValidationError::new(
                    &file.field,
                    format!(
                        "Ukuran {} maksimal {}",
                        self.label,
                        format_size(self.max_size)
                    ),
                )
                .with_constraint("max_size")
                .with_value(&file.name),
            );
        }
    }
}

/// Checks a batch of uploaded files against the configured classes.
#[derive(Debug, Clone, Default)]
pub struct UploadGuard {
    classes: Vec<FileClass>,
}

impl UploadGuard {
    /// Create an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file class.
    pub fn class(mut self, class: FileClass) -> Self {
        self.classes.push(class);
        self
    }

    /// Guard for the registration form: a required photo plus certificates.
    pub fn registration<S: AsRef<str>>(
        photo_max: u64,
        certificate_max: u64,
        certificate_extensions: &[S],
    ) -> Self {
        let extensions: Vec<&str> = certificate_extensions.iter().map(AsRef::as_ref).collect();
        Self::new()
            .class(FileClass::photo(photo_max))
            .class(FileClass::certificate(certificate_max, &extensions))
    }

    /// Configured classes.
    pub fn classes(&self) -> &[FileClass] {
        &self.classes
    }

    /// Class responsible for a form field.
    pub fn class_for(&self, field: &str) -> Option<&FileClass> {
        self.classes.iter().find(|c| c.matcher.matches(field))
    }

    /// Whether a form field accepts files at all.
    pub fn accepts(&self, field: &str) -> bool {
        self.class_for(field).is_some()
    }

    /// Largest size any class allows.
    pub fn max_file_size(&self) -> u64 {
        self.classes.iter().map(|c| c.max_size).max().unwrap_or(0)
    }

    /// Collect every violation in the batch.
    pub fn check(&self, files: &[UploadedFile]) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for file in files {
            match self.class_for(&file.field) {
                Some(class) => class.check_file(file, &mut errors),
                None => errors.push(
                    ValidationError::new(&file.field, format!("File {} tidak dikenal", file.field))
                        .with_constraint("unexpected_field")
                        .with_value(&file.name),
                ),
            }
        }

        for class in &self.classes {
            let count = files
                .iter()
                .filter(|f| class.matcher.matches(&f.field))
                .count();

            if class.required && count == 0 {
                errors.push(
                    ValidationError::new(
                        class.report_field(),
                        format!("{} wajib diunggah", class.label),
                    )
                    .with_constraint("required"),
                );
            }
            if !class.multiple && count > 1 {
                errors.push(
                    ValidationError::new(
                        class.report_field(),
                        format!("{} hanya boleh satu file", class.label),
                    )
                    .with_constraint("single"),
                );
            }
        }

        if !errors.is_empty() {
            debug!(
                files = files.len(),
                errors = errors.len(),
                "Upload guard rejected files"
            );
        }
        errors
    }

    /// Check the batch and group violations by field.
    pub fn report(&self, files: &[UploadedFile]) -> ValidationReport {
        ValidationReport::from(self.check(files))
    }
}
