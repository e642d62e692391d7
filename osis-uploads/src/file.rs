//! Uploaded file types.

use bytes::Bytes;
use mime::Mime;
use serde::{Deserialize, Serialize};

use crate::{Result, UploadError};

/// An uploaded file with its data.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the file was sent under.
    pub field: String,
    /// Original file name.
    pub name: String,
    /// Final dot-segment of the file name, as sent.
    pub extension: Option<String>,
    /// Declared MIME type.
    pub content_type: Option<Mime>,
    /// File size in bytes.
    pub size: u64,
    /// File data.
    pub data: Bytes,
}

impl UploadedFile {
    /// Create from raw bytes, guessing the content type from the name.
    pub fn from_bytes(
        field: impl Into<String>,
        name: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let name = name.into();
        let data = data.into();
        Self {
            field: field.into(),
            extension: extension_of(&name),
            content_type: mime_guess::from_path(&name).first(),
            size: data.len() as u64,
            name,
            data,
        }
    }

    /// Read a multipart file part, failing once it grows past `limit` bytes.
    pub async fn from_field(mut field: multer::Field<'static>, limit: u64) -> Result<Self> {
        let field_name = field.name().unwrap_or_default().to_string();
        let name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().cloned();

        let mut buf = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if (buf.len() + chunk.len()) as u64 > limit {
                return Err(UploadError::FileTooLarge {
                    field: field_name,
                    limit,
                });
            }
            buf.extend_from_slice(&chunk);
        }

        let data = Bytes::from(buf);
        Ok(Self {
            field: field_name,
            extension: extension_of(&name),
            content_type,
            size: data.len() as u64,
            name,
            data,
        })
    }

    /// Get the file extension (lowercase).
    pub fn extension_lowercase(&self) -> Option<String> {
        self.extension.as_ref().map(|e| e.to_lowercase())
    }

    /// Check if the file has an image MIME type.
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_ref()
            .map(|ct| ct.type_() == mime::IMAGE)
            .unwrap_or(false)
    }

    /// Check if the file is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Metadata kept with a stored registration.
    pub fn meta(&self) -> FileMeta {
        FileMeta {
            field: self.field.clone(),
            name: self.name.clone(),
            content_type: self.content_type.as_ref().map(|ct| ct.to_string()),
            size: self.size,
        }
    }
}

/// Serializable description of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Form field the file was sent under.
    pub field: String,
    /// Original file name.
    pub name: String,
    /// Declared MIME type.
    pub content_type: Option<String>,
    /// File size in bytes.
    pub size: u64,
}

/// Final dot-segment of a file name, if it has one.
fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .map(String::from)
}
