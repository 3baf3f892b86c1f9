//! HTTP JSON API for the kiosk front-end.

pub mod error;
pub mod routes;
pub mod types;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::booking::BookingEngine;

/// Photo receipts arrive base64-encoded in the request body.
pub const BODY_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: BookingEngine,
}

/// Build the API router.
///
/// With no `cors_origins` any origin is allowed.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/status", get(routes::status))
        .route("/api/book", post(routes::book))
        .route("/api/pay", post(routes::pay))
        .route("/api/power-control", post(routes::power_control))
        .route("/api/payments", get(routes::payments))
        .route("/api/reset", post(routes::reset_all))
        .route("/api/reset-single", post(routes::reset_single))
        .route("/api/esp32-status", get(routes::controllers))
        .route("/api/debug/tables", get(routes::debug_tables))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}
