//! Multipart form data parsing.

use bytes::Bytes;
use futures::Stream;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{Result, UploadError, UploadGuard, UploadedFile};

/// Multipart form data parser.
///
/// ## Example
///
/// ```rust,ignore
/// use osis_uploads::{Multipart, MultipartConstraints, UploadGuard};
///
/// async fn intake(content_type: &str, body: impl Stream<...>) -> Result<FormData, UploadError> {
///     let guard = UploadGuard::registration(2 * MB, 5 * MB, &["jpg", "png", "pdf"]);
///     let constraints = MultipartConstraints::for_guard(&guard).max_files(6);
///     Multipart::from_request(content_type, body, &constraints)?
///         .collect_form(&constraints, &guard)
///         .await
/// }
/// ```
pub struct Multipart {
    inner: multer::Multipart<'static>,
}

impl Multipart {
    /// Create a new multipart parser from a stream and boundary.
    pub fn new<S, O, E>(stream: S, boundary: &str, constraints: &MultipartConstraints) -> Self
    where
        S: Stream<Item = std::result::Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let limits = multer::Constraints::new()
            .size_limit(multer::SizeLimit::new().whole_stream(constraints.max_total_size));
        Self {
            inner: multer::Multipart::with_constraints(stream, boundary.to_string(), limits),
        }
    }

    /// Create from the request's `Content-Type` header and body.
    pub fn from_request<S, O, E>(
        content_type: &str,
        body: S,
        constraints: &MultipartConstraints,
    ) -> Result<Self>
    where
        S: Stream<Item = std::result::Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let boundary = multer::parse_boundary(content_type)?;
        Ok(Self::new(body, &boundary, constraints))
    }

    /// Get the next field from the multipart stream.
    pub async fn next_field(&mut self) -> Result<Option<multer::Field<'static>>> {
        self.inner.next_field().await.map_err(UploadError::from)
    }

    /// Collect text fields and file parts, enforcing the intake limits.
    ///
    /// File parts sent under a field the guard does not know are rejected,
    /// as are parts past `max_files`. File parts without a file name and
    /// without content (an untouched file input) are skipped.
    pub async fn collect_form(
        mut self,
        constraints: &MultipartConstraints,
        guard: &UploadGuard,
    ) -> Result<FormData> {
        let mut form = FormData::default();

        while let Some(field) = self.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_none() {
                let text = field.text().await?;
                form.push_text(&name, text);
                continue;
            }

            if !guard.accepts(&name) {
                warn!(field = %name, "Rejected file under unexpected field");
                return Err(UploadError::UnexpectedField(name));
            }

            let file = UploadedFile::from_field(field, constraints.max_file_size).await?;
            if file.name.is_empty() && file.is_empty() {
                continue;
            }

            if form.files.len() >= constraints.max_files {
                warn!(max = constraints.max_files, "Rejected upload with too many files");
                return Err(UploadError::TooManyFiles {
                    max: constraints.max_files,
                });
            }
            form.files.push(file);
        }

        debug!(
            fields = form.fields.len(),
            files = form.files.len(),
            "Parsed multipart form"
        );
        Ok(form)
    }
}

/// Collected multipart data.
#[derive(Debug, Default)]
pub struct FormData {
    /// Text fields as a JSON object.
    ///
    /// A key sent once maps to a string. A repeated key, or a key sent as
    /// `name[]`, maps to an array of strings in arrival order.
    pub fields: Map<String, Value>,
    /// Uploaded files in arrival order.
    pub files: Vec<UploadedFile>,
}

impl FormData {
    /// Create empty form data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text value under a field name.
    pub fn push_text(&mut self, name: &str, text: String) {
        let (key, forced_list) = match name.strip_suffix("[]") {
            Some(stripped) => (stripped, true),
            None => (name, false),
        };

        match self.fields.get_mut(key) {
            Some(Value::Array(items)) => items.push(Value::String(text)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(text)]);
            }
            None if forced_list => {
                self.fields
                    .insert(key.to_string(), Value::Array(vec![Value::String(text)]));
            }
            None => {
                self.fields.insert(key.to_string(), Value::String(text));
            }
        }
    }

    /// Get a text field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Text fields as a JSON object value.
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Get the first uploaded file under a field.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == name)
    }

    /// Check if there are any files.
    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    /// Get the number of files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Constraints for multipart parsing.
#[derive(Debug, Clone)]
pub struct MultipartConstraints {
    /// Maximum number of file parts.
    pub max_files: usize,
    /// Maximum size of a single file part in bytes.
    pub max_file_size: u64,
    /// Maximum size of the whole body in bytes.
    pub max_total_size: u64,
}

impl Default for MultipartConstraints {
    fn default() -> Self {
        Self {
            max_files: 6,
            max_file_size: 5 * 1024 * 1024,
            max_total_size: 32 * 1024 * 1024,
        }
    }
}

impl MultipartConstraints {
    /// Constraints sized from a guard's largest class.
    pub fn for_guard(guard: &UploadGuard) -> Self {
        Self::default().max_file_size(guard.max_file_size())
    }

    /// Set maximum number of files.
    pub fn max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self.max_total_size = self.total_for(count, self.max_file_size);
        self
    }

    /// Set maximum size of a single file.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self.max_total_size = self.total_for(self.max_files, bytes);
        self
    }

    /// Set maximum total body size.
    pub fn max_total_size(mut self, bytes: u64) -> Self {
        self.max_total_size = bytes;
        self
    }

    // room for every file at full size plus the text fields
    fn total_for(&self, files: usize, file_size: u64) -> u64 {
        (files as u64)
            .saturating_mul(file_size)
            .saturating_add(1024 * 1024)
    }
}

/// Helper to create a Multipart from an HTTP request body.
pub fn parse_multipart<S, O, E>(
    content_type: &http::HeaderValue,
    body: S,
    constraints: &MultipartConstraints,
) -> Result<Multipart>
where
    S: Stream<Item = std::result::Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let content_type = content_type
        .to_str()
        .map_err(|_| UploadError::InvalidContentType)?;

    Multipart::from_request(content_type, body, constraints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_text_shapes() {
        let mut form = FormData::new();
        form.push_text("nama_lengkap", "Budi".into());
        form.push_text("divisi", "Seni".into());
        form.push_text("divisi", "Olahraga".into());
        form.push_text("organisasi_nama[]", "Pramuka".into());

        assert_eq!(
            form.to_json(),
            json!({
                "nama_lengkap": "Budi",
                "divisi": ["Seni", "Olahraga"],
                "organisasi_nama": ["Pramuka"]
            })
        );
        assert_eq!(form.field("nama_lengkap"), Some("Budi"));
        assert_eq!(form.field("divisi"), None);
    }

    #[test]
    fn test_repeated_bracket_keys_append() {
        let mut form = FormData::new();
        form.push_text("prestasi_tahun[]", "2023".into());
        form.push_text("prestasi_tahun[]", "2024".into());
        assert_eq!(form.fields["prestasi_tahun"], json!(["2023", "2024"]));
    }

    #[test]
    fn test_constraints_scale_total() {
        let c = MultipartConstraints::default().max_files(2).max_file_size(1024);
        assert_eq!(c.max_total_size, 2 * 1024 + 1024 * 1024);
        assert_eq!(c.max_total_size(10).max_total_size, 10);
    }
}
