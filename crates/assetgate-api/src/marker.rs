//! # Client Marker Middleware
//!
//! Requests must carry the configured marker header (presence only, the
//! value is ignored). This is a client filter, not authentication.
//!
//! Exempt: `OPTIONS` and `HEAD` requests, `/file_exists/*` and `/health/*`.

use axum::extract::Request;
use axum::http::{HeaderName, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

/// Marker header name, injected into request extensions by the router.
#[derive(Debug, Clone)]
pub struct MarkerConfig {
    pub header: HeaderName,
}

fn is_exempt(request: &Request) -> bool {
    let path = request.uri().path();
    request.method() == Method::OPTIONS
        || request.method() == Method::HEAD
        || path.starts_with("/file_exists/")
        || path.starts_with("/health/")
}

pub async fn marker_middleware(request: Request, next: Next) -> Response {
    let Some(config) = request.extensions().get::<MarkerConfig>().cloned() else {
        return next.run(request).await;
    };

    if is_exempt(&request) || request.headers().contains_key(&config.header) {
        return next.run(request).await;
    }

    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        "request rejected: client marker header missing"
    );
    AppError::MissingClientMarker(format!("header {} is required", config.header)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        Router::new()
            .route("/{name}", get(|| async { "ok" }).head(|| async { "" }))
            .route("/file_exists/{name}", get(|| async { "ok" }))
            .layer(from_fn(marker_middleware))
            .layer(axum::Extension(MarkerConfig {
                header: HeaderName::from_static("x-risu-git-flag"),
            }))
    }

    #[tokio::test]
    async fn marker_present_passes() {
        let request = Request::builder()
            .uri("/a.png")
            .header("x-risu-git-flag", "1")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn marker_value_is_ignored() {
        let request = Request::builder()
            .uri("/a.png")
            .header("X-Risu-Git-Flag", "")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn marker_missing_rejected() {
        let request = Request::builder().uri("/a.png").body(Body::empty()).unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "MISSING_CLIENT_MARKER");
    }

    #[tokio::test]
    async fn head_and_existence_probe_exempt() {
        let head = Request::builder()
            .method(Method::HEAD)
            .uri("/a.png")
            .body(Body::empty())
            .unwrap();
        assert_eq!(test_app().oneshot(head).await.unwrap().status(), StatusCode::OK);

        let probe = Request::builder()
            .uri("/file_exists/a.png")
            .body(Body::empty())
            .unwrap();
        assert_eq!(test_app().oneshot(probe).await.unwrap().status(), StatusCode::OK);
    }
}
