//! Multipart intake against the registration guard

use bytes::Bytes;
use futures::stream;
use osis_uploads::{
    CERTIFICATE_EXTENSIONS, FormData, Multipart, MultipartConstraints, UploadError, UploadGuard,
};
use serde_json::json;

const BOUNDARY: &str = "osis-test-boundary";
const MB: u64 = 1024 * 1024;

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a str, &'a [u8]),
}

fn body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                out.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, content_type, data) => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(data);
            }
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    out
}

fn guard() -> UploadGuard {
    UploadGuard::registration(2 * MB, 5 * MB, CERTIFICATE_EXTENSIONS)
}

async fn intake(
    parts: &[Part<'_>],
    constraints: MultipartConstraints,
) -> Result<FormData, UploadError> {
    let data = Bytes::from(body(parts));
    let body = stream::once(async move { Ok::<Bytes, std::io::Error>(data) });
    let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
    Multipart::from_request(&content_type, body, &constraints)?
        .collect_form(&constraints, &guard())
        .await
}

#[tokio::test]
async fn test_text_fields_and_files() {
    let form = intake(
        &[
            Part::Text("nama_lengkap", "Budi Santoso"),
            Part::Text("divisi", "Seni"),
            Part::Text("divisi", "Teknologi"),
            Part::Text("organisasi_nama[]", "Pramuka"),
            Part::File("foto", "me.jpg", "image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]),
            Part::File("sertifikat_1", "juara.pdf", "application/pdf", b"%PDF-1.4"),
        ],
        MultipartConstraints::for_guard(&guard()),
    )
    .await
    .unwrap();

    assert_eq!(
        form.to_json(),
        json!({
            "nama_lengkap": "Budi Santoso",
            "divisi": ["Seni", "Teknologi"],
            "organisasi_nama": ["Pramuka"]
        })
    );
    assert_eq!(form.file_count(), 2);

    let photo = form.file("foto").unwrap();
    assert_eq!(photo.name, "me.jpg");
    assert_eq!(photo.size, 4);
    assert_eq!(photo.content_type.as_ref().map(|m| m.essence_str()), Some("image/jpeg"));

    assert!(guard().check(&form.files).is_empty());
}

#[tokio::test]
async fn test_too_many_files() {
    let err = intake(
        &[
            Part::File("foto", "a.jpg", "image/jpeg", b"a"),
            Part::File("sertifikat_1", "b.pdf", "application/pdf", b"b"),
        ],
        MultipartConstraints::default().max_files(1),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, UploadError::TooManyFiles { max: 1 }));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_unexpected_file_field() {
    let err = intake(
        &[Part::File("lampiran", "x.jpg", "image/jpeg", b"x")],
        MultipartConstraints::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, UploadError::UnexpectedField(ref f) if f == "lampiran"));
}

#[tokio::test]
async fn test_file_over_intake_ceiling() {
    let data = [7u8; 32];
    let err = intake(
        &[Part::File("foto", "big.jpg", "image/jpeg", &data)],
        MultipartConstraints::default().max_file_size(16),
    )
    .await
    .unwrap_err();

    assert!(err.is_too_large());
    assert_eq!(err.field(), Some("foto"));
    assert_eq!(err.status_code(), 413);
}

#[tokio::test]
async fn test_untouched_file_input_is_skipped() {
    let form = intake(
        &[
            Part::Text("nama_lengkap", "Budi"),
            Part::File("sertifikat_1", "", "application/octet-stream", b""),
        ],
        MultipartConstraints::default(),
    )
    .await
    .unwrap();

    assert!(!form.has_files());
    let report = guard().report(&form.files);
    assert_eq!(report.fields(), vec!["foto"]);
}

#[tokio::test]
async fn test_rejects_non_multipart_content_type() {
    let body = stream::once(async { Ok::<Bytes, std::io::Error>(Bytes::from_static(b"{}")) });
    let err = Multipart::from_request("application/json", body, &MultipartConstraints::default())
        .err()
        .unwrap();
    assert!(matches!(err, UploadError::InvalidContentType));
}
