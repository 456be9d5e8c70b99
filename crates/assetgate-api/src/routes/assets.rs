//! # Asset API
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `PUT`  | `/{filename}` | [`upload_asset`] |
//! | `GET`  | `/{filename}` | [`read_asset`] |
//! | `HEAD` | `/{filename}` | [`probe_asset`] |
//! | `GET`  | `/file_exists/{filename}` | [`file_exists`] |
//!
//! Uploads accept either a raw body or `multipart/form-data` with the
//! content in a field named `file`. The size ceiling is enforced by the
//! gateway while streaming, so the default axum body limit is disabled on
//! this route.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio_util::io::ReaderStream;

use assetgate_core::AssetName;

use crate::error::AppError;
use crate::gateway::{ReadOutcome, UploadRequest};
use crate::state::AppState;

/// `Cache-Control` for every successful serve. Content never changes under
/// a content-addressed name.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/file_exists/{filename}", get(file_exists))
        .route(
            "/{filename}",
            get(read_asset)
                .head(probe_asset)
                .put(upload_asset)
                .layer(DefaultBodyLimit::disable()),
        )
}

fn immutable() -> [(header::HeaderName, HeaderValue); 1] {
    [(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
    )]
}

/// PUT /{filename}: verify the content digest and store the asset.
async fn upload_asset(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Json<serde_json::Value>, AppError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let is_multipart = content_type
        .as_deref()
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"));

    if is_multipart {
        // Reject traversal before parsing the body.
        AssetName::parse(&filename)?;
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        loop {
            let field = multipart
                .next_field()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?
                .ok_or_else(|| AppError::BadRequest("multipart field \"file\" is missing".into()))?;
            if field.name() != Some("file") {
                continue;
            }
            let field_type = field.content_type().map(str::to_owned);
            let upload = UploadRequest {
                filename: &filename,
                content_type: field_type.as_deref(),
                declared_size: None,
            };
            state.gateway.upload(upload, field).await?;
            break;
        }
    } else {
        let declared_size = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let upload = UploadRequest {
            filename: &filename,
            content_type: content_type.as_deref(),
            declared_size,
        };
        let body = request.into_body().into_data_stream();
        state.gateway.upload(upload, body).await?;
    }

    Ok(Json(json!({ "status": "ok" })))
}

/// GET /{filename}: stream the file (local) or redirect (remote).
async fn read_asset(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    match state.gateway.read(&filename).await? {
        ReadOutcome::Local { name, path } => serve_file(&name, &path).await,
        ReadOutcome::Redirect { url } => {
            Ok((immutable(), Redirect::temporary(&url)).into_response())
        }
    }
}

async fn serve_file(name: &AssetName, path: &FsPath) -> Result<Response, AppError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("asset {name} not found")));
        }
        Err(e) => return Err(AppError::BackendUnavailable(e.to_string())),
    };
    let len = file
        .metadata()
        .await
        .map_err(|e| AppError::BackendUnavailable(e.to_string()))?
        .len();
    let mime = mime_guess::from_path(name.as_str()).first_or_octet_stream();

    Ok((
        StatusCode::OK,
        immutable(),
        [
            (header::CONTENT_TYPE, mime.essence_str().to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// HEAD /{filename}: 200 if the asset exists.
async fn probe_asset(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    state.gateway.probe(&filename).await?;
    Ok((StatusCode::OK, immutable()).into_response())
}

/// GET /file_exists/{filename}: the probe for clients that cannot send HEAD.
async fn file_exists(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    state.gateway.probe(&filename).await?;
    Ok((
        StatusCode::OK,
        immutable(),
        Json(json!({ "filename": filename, "exists": true })),
    )
        .into_response())
}
