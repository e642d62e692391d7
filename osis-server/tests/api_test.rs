//! Router-level tests for the portal endpoints

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::get,
};
use chrono::{Local, Months};
use osis_config::{PortalConfig, RateLimitSettings, ValidationMode};
use osis_server::{AppState, app, panic_response};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;

const BOUNDARY: &str = "osis-api-boundary";

struct Form {
    texts: Vec<(String, String)>,
    files: Vec<(String, String, Vec<u8>)>,
}

impl Form {
    fn valid() -> Self {
        let birth = Local::now().date_naive() - Months::new(16 * 12);
        let texts = [
            ("nama_lengkap", "Budi Santoso".to_string()),
            ("nama_panggilan", "Budi".to_string()),
            ("kelas", "XI".to_string()),
            ("jurusan", "IPA".to_string()),
            ("tempat_lahir", "Bandung".to_string()),
            ("tanggal_lahir", birth.format("%Y-%m-%d").to_string()),
            ("alamat", "Jl. Merdeka No. 10, Bandung".to_string()),
            ("agama", "Islam".to_string()),
            ("jenis_kelamin", "Laki-laki".to_string()),
            ("nomor_telepon", "081234567890".to_string()),
            (
                "motivasi",
                "Saya ingin belajar berorganisasi dan melayani teman-teman.".to_string(),
            ),
            ("divisi", "Seni".to_string()),
            (
                "alasan_Seni",
                "Saya aktif di paduan suara sekolah.".to_string(),
            ),
        ];

        Self {
            texts: texts
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            files: vec![(
                "foto".to_string(),
                "pas-foto.jpg".to_string(),
                vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
            )],
        }
    }

    fn set(mut self, name: &str, value: &str) -> Self {
        self.texts.retain(|(k, _)| k != name);
        self.texts.push((name.to_string(), value.to_string()));
        self
    }

    fn add(mut self, name: &str, value: &str) -> Self {
        self.texts.push((name.to_string(), value.to_string()));
        self
    }

    fn without(mut self, name: &str) -> Self {
        self.texts.retain(|(k, _)| k != name);
        self.files.retain(|(k, _, _)| k != name);
        self
    }

    fn file(mut self, field: &str, filename: &str, data: &[u8]) -> Self {
        self.files
            .push((field.to_string(), filename.to_string(), data.to_vec()));
        self
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in &self.texts {
            out.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        for (field, filename, data) in &self.files {
            out.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    BOUNDARY, field, filename
                )
                .as_bytes(),
            );
            out.extend_from_slice(data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        out
    }
}

fn peer(ip: &str) -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::new(ip.parse().unwrap(), 40000))
}

fn router(config: PortalConfig) -> Router {
    app(AppState::new(config).unwrap())
}

fn register_request(form: &Form, ip: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/register")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .extension(peer(ip))
        .body(Body::from(form.encode()))
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .extension(peer("10.0.0.99"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .extension(peer("10.0.0.50"))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

#[tokio::test]
async fn test_register_and_lookup() {
    let app = router(PortalConfig::default());

    let (status, headers, body) = send(&app, register_request(&Form::valid(), "10.0.0.1")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "pending");
    assert_eq!(headers["x-ratelimit-limit"], "3");
    assert_eq!(headers["x-ratelimit-remaining"], "2");

    let ticket = body["ticket"].as_str().unwrap().to_string();
    assert!(osis_validation::registration::is_structured_ticket(&ticket));

    let (status, _, body) = send(&app, get_request(&format!("/api/ticket/{}", ticket))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ticket"], ticket.as_str());
    assert_eq!(body["data"]["nama_lengkap"], "Budi Santoso");
    assert_eq!(body["data"]["divisi"], json!(["Seni"]));
    assert_eq!(body["data"]["status"], "pending");
}

#[tokio::test]
async fn test_register_strict_rejects_with_grouped_errors() {
    let app = router(PortalConfig::default());
    let form = Form::valid()
        .without("motivasi")
        .add("divisi", "Teknologi")
        .add("divisi", "Humas")
        .set("alamat", "Pendek");

    let (status, _, body) = send(&app, register_request(&form, "10.0.0.2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Data tidak valid. Periksa kembali isian Anda.");
    assert_eq!(body["errors"]["motivasi"], json!(["Motivasi wajib diisi"]));
    assert_eq!(body["errors"]["alamat"], json!(["Alamat minimal 10 karakter"]));
    assert!(body["errors"]["divisi"].is_array());
    // Teknologi and Humas are selected without a reason
    assert!(body["errors"]["alasan_Teknologi"].is_array());
    assert!(body["errors"]["alasan_Humas"].is_array());
    assert!(body["error_count"].as_u64().unwrap() >= 5);
}

#[tokio::test]
async fn test_register_rejects_bad_upload_with_field_errors() {
    let app = router(PortalConfig::default());
    let form = Form::valid()
        .without("foto")
        .file("foto", "pas-foto.gif", b"GIF89a")
        .set("alamat", "Pendek");

    let (status, _, body) = send(&app, register_request(&form, "10.0.0.3")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["foto"], json!(["Format Foto harus JPG, JPEG, PNG"]));
    assert!(body["errors"]["alamat"].is_array());
    assert_eq!(body["error_count"], 2);
}

#[tokio::test]
async fn test_manual_review_keeps_field_failures() {
    let config = PortalConfig {
        validation_mode: ValidationMode::ManualReview,
        ..PortalConfig::default()
    };
    let app = router(config);

    let form = Form::valid().set("alamat", "Pendek");
    let (status, _, body) = send(&app, register_request(&form, "10.0.0.4")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "needs_review");

    // uploads still reject
    let form = Form::valid().without("foto");
    let (status, _, body) = send(&app, register_request(&form, "10.0.0.4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["foto"], json!(["Foto wajib diunggah"]));
}

#[tokio::test]
async fn test_register_strips_markup() {
    let app = router(PortalConfig::default());
    let form = Form::valid().set("nama_lengkap", "<script>alert(1)</script>Budi Santoso");

    let (status, _, body) = send(&app, register_request(&form, "10.0.0.5")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let ticket = body["ticket"].as_str().unwrap();
    let (_, _, body) = send(&app, get_request(&format!("/api/ticket/{}", ticket))).await;
    assert_eq!(body["data"]["nama_lengkap"], "Budi Santoso");
}

#[tokio::test]
async fn test_duplicate_phone_conflicts() {
    let app = router(PortalConfig::default());

    let (status, _, _) = send(&app, register_request(&Form::valid(), "10.0.0.6")).await;
    assert_eq!(status, StatusCode::CREATED);

    let again = Form::valid().set("nomor_telepon", "+62 812-3456-7890");
    let (status, _, body) = send(&app, register_request(&again, "10.0.0.7")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_registration_rate_limit() {
    let app = router(PortalConfig::default());
    // invalid submissions still spend the budget
    let form = Form::valid().without("motivasi");

    for _ in 0..3 {
        let (status, _, _) = send(&app, register_request(&form, "10.0.0.8")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, headers, body) = send(&app, register_request(&form, "10.0.0.8")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["message"],
        "Terlalu banyak permintaan. Silakan coba lagi nanti."
    );
    assert_eq!(headers["x-ratelimit-remaining"], "0");
    assert!(headers.contains_key(header::RETRY_AFTER));

    // other clients and other endpoints have their own budgets
    let (status, _, _) = send(&app, register_request(&form, "10.0.0.9")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = send(&app, get_request("/api/ticket/UNKNOWN12345")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_forwarded_for_ignored_from_untrusted_peer() {
    let app = router(PortalConfig::default());
    let form = Form::valid().without("motivasi");

    let mut limited = 0;
    for i in 0..6 {
        let mut request = register_request(&form, "198.51.100.9");
        request
            .headers_mut()
            .insert("x-forwarded-for", format!("10.9.9.{}", i).parse().unwrap());
        let (status, _, _) = send(&app, request).await;
        if status == StatusCode::TOO_MANY_REQUESTS {
            limited += 1;
        }
    }
    assert_eq!(limited, 3);
}

#[tokio::test]
async fn test_trusted_proxy_forwards_client_address() {
    let config = PortalConfig {
        trusted_proxies: vec!["10.0.0.1".parse().unwrap()],
        ..PortalConfig::default()
    };
    let app = router(config);
    let form = Form::valid().without("motivasi");

    for _ in 0..3 {
        let mut request = register_request(&form, "10.0.0.1");
        request
            .headers_mut()
            .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let mut request = register_request(&form, "10.0.0.1");
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // a different client behind the same proxy has its own budget
    let mut request = register_request(&form, "10.0.0.1");
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.8".parse().unwrap());
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn test_general_rate_limit_window_elapses() {
    let config = PortalConfig {
        rate_limit: RateLimitSettings {
            max_requests: 2,
            window: Duration::from_secs(60),
        },
        ..PortalConfig::default()
    };
    let app = router(config);

    for _ in 0..2 {
        let (status, _, _) = send(&app, get_request("/api/ticket/UNKNOWN12345")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, _, _) = send(&app, get_request("/api/ticket/UNKNOWN12345")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // health is not limited
    let (status, headers, body) = send(&app, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(!headers.contains_key("x-ratelimit-limit"));

    tokio::time::advance(Duration::from_secs(61)).await;
    let (status, _, _) = send(&app, get_request("/api/ticket/UNKNOWN12345")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_intake_errors() {
    let app = router(PortalConfig::default());

    let form = Form::valid().file("lampiran", "surat.pdf", b"%PDF");
    let (status, _, body) = send(&app, register_request(&form, "10.0.1.1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Field file tidak dikenal: lampiran");

    let mut form = Form::valid();
    for i in 1..=6 {
        form = form.file(&format!("sertifikat_{}", i), "juara.pdf", b"%PDF");
    }
    let (status, _, body) = send(&app, register_request(&form, "10.0.1.2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Terlalu banyak file. Maksimal 6 file");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/register")
        .header(header::CONTENT_TYPE, "application/json")
        .extension(peer("10.0.1.3"))
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Permintaan harus berupa multipart/form-data");
}

#[tokio::test]
async fn test_photo_over_limit_is_payload_error() {
    let config = PortalConfig {
        photo_max_file_size: 1024,
        max_file_size: 1024,
        ..PortalConfig::default()
    };
    let app = router(config);

    let form = Form::valid()
        .without("foto")
        .file("foto", "besar.jpg", &vec![0u8; 4096]);
    let (status, _, body) = send(&app, register_request(&form, "10.0.1.4")).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_ticket_lookup_formats() {
    let app = router(PortalConfig::default());

    let (status, _, body) = send(&app, get_request("/api/ticket/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["ticket"], json!(["Format tiket tidak valid"]));

    let (status, _, body) = send(&app, get_request("/api/ticket/OSIS24-000001-A")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Tiket tidak ditemukan");
}

#[tokio::test]
async fn test_admin_review_flow() {
    let app = router(PortalConfig::default());
    let (_, _, body) = send(&app, register_request(&Form::valid(), "10.0.2.1")).await;
    let ticket = body["ticket"].as_str().unwrap().to_string();

    let (status, _, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/admin/action",
            json!({ "ticket": ticket, "action": "reject" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["reason"], json!(["Alasan penolakan wajib diisi"]));

    let (status, _, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/admin/action",
            json!({ "ticket": ticket, "action": "approve" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["divisi"].is_array());
    assert!(body["errors"].get("reason").is_none());

    let (status, _, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/admin/action",
            json!({ "ticket": ticket, "action": "approve", "divisi": "Seni" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "approved");

    let (_, _, body) = send(&app, get_request(&format!("/api/ticket/{}", ticket))).await;
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["assigned_division"], "Seni");

    let (status, _, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/admin/action",
            json!({ "ticket": ticket, "action": "delete" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("status").is_none());

    let (status, _, _) = send(&app, get_request(&format!("/api/ticket/{}", ticket))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/admin/action",
            json!({ "ticket": ticket, "action": "delete" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_action_rejects_legacy_ticket_and_bad_json() {
    let app = router(PortalConfig::default());

    let (status, _, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/admin/action",
            json!({ "ticket": "LEGACY12345", "action": "delete" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["ticket"].is_array());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/admin/action")
        .header(header::CONTENT_TYPE, "application/json")
        .extension(peer("10.0.2.2"))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_admin_token_required_when_configured() {
    assert!(AppState::new(PortalConfig::default()).unwrap().warn_if_admin_open());

    let config = PortalConfig {
        admin_token: Some("rahasia".to_string()),
        ..PortalConfig::default()
    };
    assert!(!AppState::new(config.clone()).unwrap().warn_if_admin_open());
    let app = router(config);

    let (status, _, body) = send(&app, get_request("/api/admin/settings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token admin diperlukan");

    let request = Request::builder()
        .uri("/api/admin/settings")
        .header(header::AUTHORIZATION, "Bearer salah")
        .extension(peer("10.0.3.1"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/admin/settings")
        .header(header::AUTHORIZATION, "Bearer rahasia")
        .extension(peer("10.0.3.1"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["registration_open"], true);
}

#[tokio::test]
async fn test_settings_update() {
    let app = router(PortalConfig::default());

    let (status, _, body) = send(
        &app,
        json_request(
            Method::PUT,
            "/api/admin/settings",
            json!({ "chat_id": "abc", "registration_open": "maybe" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["chat_id"].is_array());
    assert!(body["errors"]["registration_open"].is_array());

    let (status, _, body) = send(
        &app,
        json_request(
            Method::PUT,
            "/api/admin/settings",
            json!({
                "bot_token": "123456789:ABCdefGHIjklMNOpqrSTUvwxYZ0123456",
                "chat_id": "-1001234567890",
                "max_file_size": 3,
                "registration_open": false
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["settings"]["bot_token"], "123456789:****");
    assert_eq!(body["settings"]["max_file_size"], 3);
    assert_eq!(body["settings"]["registration_open"], false);

    let (status, _, body) = send(&app, register_request(&Form::valid(), "10.0.4.1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Pendaftaran sedang ditutup");

    // an empty update changes nothing
    let (status, _, body) = send(
        &app,
        json_request(Method::PUT, "/api/admin/settings", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["chat_id"], "-1001234567890");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = router(PortalConfig::default());
    let (status, _, body) = send(&app, get_request("/api/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

async fn boom() -> &'static str {
    panic!("handler exploded")
}

#[tokio::test]
async fn test_panic_becomes_generic_500() {
    let app = Router::new()
        .route("/boom", get(boom))
        .layer(CatchPanicLayer::custom(panic_response));

    let (status, _, body) = send(&app, get_request("/boom")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Terjadi kesalahan pada server");
}
