//! # HTTP Integration Tests for assetgate-api
//!
//! Drives the full router (CORS, tracing, marker middleware, handlers) with
//! a local filesystem backend in a temporary directory and the in-memory
//! catalog. The redirect case uses a remote backend that is never contacted.

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use assetgate_api::bootstrap::bootstrap;
use assetgate_api::catalog::{MemoryCatalog, NewAsset};
use assetgate_api::config::{AppConfig, StorageConfig, DEFAULT_MARKER_HEADER};
use assetgate_api::gateway::{AssetGateway, GatewayOptions};
use assetgate_api::state::AppState;
use assetgate_core::{compute_digest, AssetName};
use assetgate_storage::{RemoteSettings, RemoteStorage};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png but close enough";

struct TestApp {
    router: axum::Router,
    state: AppState,
    dir: TempDir,
}

async fn test_app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig {
        storage: StorageConfig::Local {
            root: dir.path().to_path_buf(),
        },
        sweep_interval: None,
        ..AppConfig::default()
    };
    configure(&mut config);
    let state = bootstrap(config).await.unwrap();
    TestApp {
        router: assetgate_api::app(state.clone()),
        state,
        dir,
    }
}

async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

fn png_name() -> String {
    format!("{}.png", compute_digest(PNG_BYTES))
}

fn put_raw(uri: &str, content_type: &str, body: &[u8]) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(DEFAULT_MARKER_HEADER, "1")
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body.to_vec()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(DEFAULT_MARKER_HEADER, "1")
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn upload_png(app: &TestApp) {
    let uri = format!("/{}", png_name());
    let response = app
        .router
        .clone()
        .oneshot(put_raw(&uri, "image/png", PNG_BYTES))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Upload -------------------------------------------------------------------

#[tokio::test]
async fn raw_upload_then_read_back() {
    let app = test_app().await;
    let uri = format!("/{}", png_name());

    let response = app
        .router
        .clone()
        .oneshot(put_raw(&uri, "image/png", PNG_BYTES))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
    assert!(app.dir.path().join(png_name()).is_file());

    let response = app.router.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=31536000, immutable"
    );
    assert_eq!(body_bytes(response).await, PNG_BYTES);
}

#[tokio::test]
async fn multipart_upload_uses_file_field() {
    let app = test_app().await;
    let boundary = "assetgate-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             ignored\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(PNG_BYTES);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/{}", png_name()))
        .header(DEFAULT_MARKER_HEADER, "1")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let name = AssetName::parse(&png_name()).unwrap();
    let asset = app
        .state
        .gateway
        .catalog()
        .find_by_filename(&name)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(asset.file_type, "image/png");
    assert_eq!(asset.file_size, PNG_BYTES.len() as i64);
}

#[tokio::test]
async fn multipart_without_file_field_is_rejected() {
    let app = test_app().await;
    let boundary = "b";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/{}", png_name()))
        .header(DEFAULT_MARKER_HEADER, "1")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn hash_mismatch_stores_nothing() {
    let app = test_app().await;
    let wrong = format!("{}.png", compute_digest(b"something else"));

    let response = app
        .router
        .clone()
        .oneshot(put_raw(&format!("/{wrong}"), "image/png", PNG_BYTES))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "CONTENT_HASH_MISMATCH");
    assert_eq!(
        json["error"]["details"]["actual"],
        compute_digest(PNG_BYTES).as_str()
    );

    assert!(!app.dir.path().join(&wrong).exists());
    let name = AssetName::parse(&wrong).unwrap();
    assert!(app
        .state
        .gateway
        .catalog()
        .find_by_filename(&name)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = test_app_with(|c| c.max_upload_bytes = 16).await;
    let response = app
        .router
        .clone()
        .oneshot(put_raw(&format!("/{}", png_name()), "image/png", PNG_BYTES))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert!(!app.dir.path().join(png_name()).exists());
}

#[tokio::test]
async fn disallowed_media_type_is_rejected() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(put_raw(&format!("/{}", png_name()), "text/plain", PNG_BYTES))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "UNSUPPORTED_MEDIA_TYPE"
    );
}

#[tokio::test]
async fn encoded_separator_is_an_invalid_filename() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(get("/..%2Fetc%2Fpasswd"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_FILENAME");
}

// -- Read ---------------------------------------------------------------------

#[tokio::test]
async fn unknown_asset_is_not_found() {
    let app = test_app().await;
    let uri = format!("/{}.png", compute_digest(b"never uploaded"));
    let response = app.router.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn read_within_cooldown_skips_catalog() {
    let app = test_app().await;
    upload_png(&app).await;
    let uri = format!("/{}", png_name());

    let response = app.router.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The row is gone but the file is still on disk: a read inside the
    // cooldown window is served from the backend alone.
    let name = AssetName::parse(&png_name()).unwrap();
    assert!(app.state.gateway.catalog().delete(&name).await.unwrap());

    let response = app.router.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, PNG_BYTES);
}

#[tokio::test]
async fn catalog_row_without_file_is_inconsistent() {
    let app = test_app().await;
    upload_png(&app).await;
    std::fs::remove_file(app.dir.path().join(png_name())).unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/{}", png_name())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "STORAGE_INCONSISTENT"
    );
}

#[tokio::test]
async fn remote_read_is_a_cacheable_temporary_redirect() {
    let client = aws_sdk_s3::Client::from_conf(
        aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:1")
            .build(),
    );
    let settings = RemoteSettings {
        bucket: "assets".into(),
        public_base_url: "https://cdn.example.com".into(),
        ..RemoteSettings::default()
    };
    let storage = RemoteStorage::from_client(client, "assets", "https://cdn.example.com");
    let gateway = AssetGateway::new(
        storage.into(),
        MemoryCatalog::new().into(),
        GatewayOptions::default(),
    );
    let name = AssetName::parse(&png_name()).unwrap();
    gateway
        .catalog()
        .upsert(
            NewAsset {
                filename: name,
                file_type: "image/png".into(),
                file_size: PNG_BYTES.len() as i64,
            },
            chrono::Utc::now(),
        )
        .await
        .unwrap();
    let config = AppConfig {
        storage: StorageConfig::Remote(settings),
        sweep_interval: None,
        ..AppConfig::default()
    };
    let router = assetgate_api::app(AppState::new(config, gateway));

    let response = router.oneshot(get(&format!("/{}", png_name()))).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        format!("https://cdn.example.com/{}", png_name()).as_str()
    );
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=31536000, immutable"
    );
}

// -- Existence probes ---------------------------------------------------------

#[tokio::test]
async fn head_and_file_exists_report_presence() {
    let app = test_app().await;
    upload_png(&app).await;

    // Neither probe needs the marker header.
    let head = Request::builder()
        .method("HEAD")
        .uri(format!("/{}", png_name()))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(head).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .uri(format!("/file_exists/{}", png_name()))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["exists"], true);
    assert_eq!(json["filename"], png_name());
}

#[tokio::test]
async fn probes_for_missing_asset_are_not_found() {
    let app = test_app().await;
    let missing = format!("{}.png", compute_digest(b"missing"));

    let head = Request::builder()
        .method("HEAD")
        .uri(format!("/{missing}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(head).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = Request::builder()
        .uri(format!("/file_exists/{missing}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Middleware ---------------------------------------------------------------

#[tokio::test]
async fn missing_marker_header_is_rejected() {
    let app = test_app().await;
    let request = Request::builder()
        .uri(format!("/{}", png_name()))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "MISSING_CLIENT_MARKER"
    );
}

#[tokio::test]
async fn cors_preflight_mirrors_origin() {
    let app = test_app().await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri(format!("/{}", png_name()))
        .header(header::ORIGIN, "https://client.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, DEFAULT_MARKER_HEADER)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://client.example"
    );
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("PUT"));
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn health_probes_answer_without_marker() {
    let app = test_app().await;
    for (uri, expected) in [("/health/liveness", "ok"), ("/health/readiness", "ready")] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, expected.as_bytes());
    }
}
