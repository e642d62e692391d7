//! Integration tests for common portal workflows.
//!
//! These tests run the library pipeline the server uses, one crate after
//! another, without going through HTTP.

use chrono::{Local, Months};
use osis_portal::osis_config::ConfigVars;
use osis_portal::osis_uploads::CERTIFICATE_EXTENSIONS;
use osis_portal::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const MB: u64 = 1024 * 1024;

fn applicant() -> Value {
    let birth = Local::now().date_naive() - Months::new(15 * 12);
    json!({
        "nama_lengkap": "Dewi Lestari",
        "nama_panggilan": "Dewi",
        "kelas": "X",
        "jurusan": "IPA",
        "tempat_lahir": "Yogyakarta",
        "tanggal_lahir": birth.format("%Y-%m-%d").to_string(),
        "alamat": "Jl. Malioboro No. 21, Yogyakarta",
        "agama": "Katolik",
        "jenis_kelamin": "Perempuan",
        "nomor_telepon": "+62 812 1111 2222",
        "motivasi": "Ingin mengembangkan kemampuan berorganisasi di sekolah.",
        "divisi": ["Teknologi", "Lingkungan"],
        "alasan_Teknologi": "Saya senang membuat aplikasi sederhana.",
        "alasan_Lingkungan": "Saya aktif di kegiatan bank sampah.",
        "motto": "<script>alert('x')</script>Terus belajar"
    })
}

// =============================================================================
// Registration pipeline
// =============================================================================

#[test]
fn test_sanitize_then_validate_registration() {
    let body = applicant();
    assert_eq!(XssDetector::scan_json(&body).len(), 1);

    let clean = XssSanitizer::sanitize_json(&body);
    assert_eq!(clean["motto"], "Terus belajar");

    let report = registration_rules().validate(&ValidationRequest::from_json(&clean));
    assert!(report.is_valid(), "{:?}", report.errors);
}

#[test]
fn test_field_and_upload_errors_merge() {
    let mut body = applicant();
    body["divisi"] = json!(["Teknologi", "Lingkungan", "Seni"]);
    body["alasan_Lingkungan"] = json!("pendek");

    let mut report = registration_rules().validate(&ValidationRequest::from_json(&body));
    assert!(report.has_field("divisi"));
    assert!(report.has_field("alasan_Lingkungan"));
    assert!(report.has_field("alasan_Seni"));

    let guard = UploadGuard::registration(2 * MB, 5 * MB, CERTIFICATE_EXTENSIONS);
    let files = vec![UploadedFile::from_bytes(
        "sertifikat1",
        "piagam.exe",
        vec![0u8; 128],
    )];
    report.merge(guard.report(&files));

    assert!(report.has_field("foto"));
    assert!(report.has_field("sertifikat1"));
    let total: usize = report.errors.values().map(Vec::len).sum();
    assert_eq!(report.error_count, total);
}

#[test]
fn test_admin_rules_follow_action() {
    let reject = ValidationRequest::from_json(&json!({
        "ticket": "OSIS26-000042-K",
        "action": "reject"
    }));
    let report = admin_action_rules().validate(&reject);
    assert!(report.has_field("reason"));
    assert!(!report.has_field("divisi"));

    let delete = ValidationRequest::from_json(&json!({
        "ticket": "OSIS26-000042-K",
        "action": "delete"
    }));
    assert!(admin_action_rules().validate(&delete).is_valid());
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_limiters_share_one_store() {
    let store: Arc<dyn RateLimitStore> = Arc::new(MemoryStore::new());
    let register = RateLimiter::builder()
        .sliding_window(1, Duration::from_secs(3600))
        .store(store.clone())
        .key_prefix("register")
        .build()
        .unwrap();
    let api = RateLimiter::builder()
        .sliding_window(2, Duration::from_secs(900))
        .store(store)
        .key_prefix("api")
        .build()
        .unwrap();

    assert!(register.check("198.51.100.4").await.unwrap().allowed);
    assert!(!register.check("198.51.100.4").await.unwrap().allowed);

    // separate budgets for the same client
    assert!(api.check("198.51.100.4").await.unwrap().allowed);
    assert!(api.check("198.51.100.4").await.unwrap().allowed);
    assert!(!api.check("198.51.100.4").await.unwrap().allowed);

    tokio::time::advance(Duration::from_secs(3601)).await;
    assert!(register.check("198.51.100.4").await.unwrap().allowed);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_drives_upload_limits() {
    let vars: ConfigVars = [
        ("PHOTO_MAX_FILE_SIZE", "1048576"),
        ("MAX_FILE_SIZE", "3145728"),
        ("VALIDATION_MODE", "manual_review"),
    ]
    .into_iter()
    .collect();
    let config = PortalConfig::from_vars(&vars).unwrap();
    assert_eq!(config.validation_mode, ValidationMode::ManualReview);

    let guard = UploadGuard::registration(
        config.photo_max_file_size,
        config.max_file_size,
        &config.allowed_file_types,
    );
    let files = vec![UploadedFile::from_bytes(
        "foto",
        "foto.jpg",
        vec![0u8; (config.photo_max_file_size + 1) as usize],
    )];
    let report = guard.report(&files);
    assert!(report.has_field("foto"));
}

#[cfg(feature = "server")]
#[tokio::test]
async fn test_server_state_from_default_config() {
    let state = AppState::new(PortalConfig::default()).unwrap();
    assert!(state.registration_open());
    assert_eq!(state.store.count().await.unwrap(), 0);
    let _router = app(state);
}
