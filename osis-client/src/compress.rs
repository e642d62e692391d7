//! Client-side image compression
//!
//! Large JPEG and PNG attachments are scaled down to fit the configured
//! dimension and re-encoded as JPEG before they are uploaded. Decoding runs
//! on the blocking pool.

use crate::config::CompressionConfig;
use crate::error::{ClientError, Result};
use bytes::Bytes;
use futures::future::try_join_all;
use image::{DynamicImage, GenericImageView, ImageReader, imageops::FilterType};
use std::io::Cursor;
use tracing::debug;

/// A file attached to a registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Form field name (`foto`, `sertifikat1`, ...).
    pub field: String,
    /// File name sent to the server.
    pub file_name: String,
    /// MIME type sent to the server.
    pub content_type: String,
    /// File content.
    pub data: Bytes,
}

impl Attachment {
    /// Create an attachment, guessing the content type from the file name.
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            field: field.into(),
            file_name,
            content_type,
            data: data.into(),
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for an empty file.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn is_compressible(&self) -> bool {
        matches!(self.content_type.as_str(), "image/jpeg" | "image/png")
    }

    fn jpeg_name(&self) -> String {
        let stem = self
            .file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name);
        format!("{}.jpg", stem)
    }
}

/// Decode, fit within `max_dimension` and re-encode as JPEG.
pub fn compress_image(data: &[u8], config: &CompressionConfig) -> Result<Bytes> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ClientError::Compression(format!("failed to detect format: {}", e)))?
        .decode()
        .map_err(|e| ClientError::Compression(format!("failed to decode: {}", e)))?;

    let (width, height) = img.dimensions();
    let img = if width.max(height) > config.max_dimension {
        img.resize(config.max_dimension, config.max_dimension, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel
    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buffer = Vec::new();
    let quality = config.quality.clamp(1, 100);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    img.write_with_encoder(encoder)
        .map_err(|e| ClientError::Compression(format!("failed to encode: {}", e)))?;

    Ok(Bytes::from(buffer))
}

/// Compress one attachment if it is an image above the threshold.
///
/// A result that is not smaller than the input is discarded.
pub async fn compress(attachment: Attachment, config: &CompressionConfig) -> Result<Attachment> {
    if !config.enabled || !attachment.is_compressible() || attachment.len() <= config.threshold {
        return Ok(attachment);
    }

    let data = attachment.data.clone();
    let settings = config.clone();
    let compressed = tokio::task::spawn_blocking(move || compress_image(&data, &settings))
        .await
        .map_err(|e| ClientError::Compression(format!("compression task failed: {}", e)))??;

    if compressed.len() >= attachment.len() {
        debug!(
            file = %attachment.file_name,
            original = attachment.len(),
            compressed = compressed.len(),
            "Compressed image not smaller, keeping original"
        );
        return Ok(attachment);
    }

    debug!(
        file = %attachment.file_name,
        original = attachment.len(),
        compressed = compressed.len(),
        "Image compressed"
    );

    Ok(Attachment {
        file_name: attachment.jpeg_name(),
        content_type: "image/jpeg".to_string(),
        data: compressed,
        field: attachment.field,
    })
}

/// Compress every attachment concurrently, failing on the first error.
pub async fn compress_all(
    attachments: Vec<Attachment>,
    config: &CompressionConfig,
) -> Result<Vec<Attachment>> {
    try_join_all(attachments.into_iter().map(|a| compress(a, config))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};

    fn noise_png(width: u32, height: u32) -> Vec<u8> {
        let mut seed: u32 = 0x1234_5678;
        let img = ImageBuffer::from_fn(width, height, |_, _| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let [r, g, b, _] = seed.to_le_bytes();
            Rgb([r, g, b])
        });
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_attachment_content_type() {
        assert_eq!(Attachment::new("foto", "a.PNG", vec![1]).content_type, "image/png");
        assert_eq!(
            Attachment::new("sertifikat1", "piagam.pdf", vec![1]).content_type,
            "application/pdf"
        );
        assert_eq!(Attachment::new("foto", "pas.foto.jpeg", vec![1]).jpeg_name(), "pas.foto.jpg");
    }

    #[test]
    fn test_compress_image_fits_dimension() {
        let png = noise_png(1600, 800);
        let jpeg = compress_image(&png, &CompressionConfig::default()).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (1280, 640));
        assert!(jpeg.len() < png.len());
    }

    #[test]
    fn test_compress_image_rejects_garbage() {
        let err = compress_image(b"not an image", &CompressionConfig::default()).unwrap_err();
        assert!(matches!(err, ClientError::Compression(_)));
    }

    #[tokio::test]
    async fn test_compress_large_png() {
        let attachment = Attachment::new("foto", "foto.png", noise_png(1600, 800));
        let original = attachment.len();

        let out = compress(attachment, &CompressionConfig::default()).await.unwrap();
        assert_eq!(out.file_name, "foto.jpg");
        assert_eq!(out.content_type, "image/jpeg");
        assert_eq!(out.field, "foto");
        assert!(out.len() < original);
    }

    #[tokio::test]
    async fn test_small_and_non_image_untouched() {
        let config = CompressionConfig::default();

        let small = Attachment::new("foto", "foto.png", noise_png(2, 2));
        assert_eq!(compress(small.clone(), &config).await.unwrap(), small);

        let pdf = Attachment::new("sertifikat1", "piagam.pdf", vec![0u8; 600 * 1024]);
        assert_eq!(compress(pdf.clone(), &config).await.unwrap(), pdf);
    }

    #[tokio::test]
    async fn test_larger_result_discarded() {
        let config = CompressionConfig {
            threshold: 0,
            ..Default::default()
        };
        let tiny = Attachment::new("foto", "foto.png", noise_png(2, 2));
        assert_eq!(compress(tiny.clone(), &config).await.unwrap(), tiny);
    }

    #[tokio::test]
    async fn test_compress_all_fails_on_bad_image() {
        let config = CompressionConfig {
            threshold: 0,
            ..Default::default()
        };
        let files = vec![
            Attachment::new("foto", "foto.png", noise_png(4, 4)),
            Attachment::new("sertifikat1", "scan.jpg", b"broken".to_vec()),
        ];
        let err = compress_all(files, &config).await.unwrap_err();
        assert!(matches!(err, ClientError::Compression(_)));
    }
}
