//! # assetgate-api: Content-Addressed Asset Gateway
//!
//! Clients upload assets under a filename equal to the SHA-256 digest of the
//! content (plus an optional extension) and read them back by that name.
//! Metadata lives in the asset catalog; bytes live in the local filesystem
//! or an S3-compatible bucket. A retention sweeper evicts assets that have
//! not been read for a configurable number of days.
//!
//! ## API Surface
//!
//! | Path | Module |
//! |------|--------|
//! | `/{filename}` (GET, HEAD, PUT) | [`routes::assets`] |
//! | `/file_exists/{filename}` | [`routes::assets`] |
//! | `/health/liveness`, `/health/readiness` | this module |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → MarkerMiddleware → Handler
//! ```

pub mod bootstrap;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod lock;
pub mod marker;
pub mod routes;
pub mod state;
pub mod sweeper;

use std::time::Duration;

use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::marker::MarkerConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes are mounted outside the marker middleware.
pub fn app(state: AppState) -> Router {
    let marker = MarkerConfig {
        header: state.config.marker_header.clone(),
    };

    let api = Router::new()
        .merge(routes::assets::router())
        .layer(from_fn(marker::marker_middleware))
        .layer(axum::Extension(marker))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new()
        .merge(health)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Any origin (mirrored), any request headers, the four asset methods.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::HEAD, Method::PUT, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .max_age(Duration::from_secs(86_400))
}

async fn liveness() -> &'static str {
    "ok"
}

/// Ready when the catalog answers.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.gateway.catalog().ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "catalog unavailable")
        }
    }
}
