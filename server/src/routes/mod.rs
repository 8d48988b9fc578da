//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the three tutor endpoints the notebook's annotation
//! client calls, plus a health check, under a single Axum router.

pub mod api;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/analyze", post(api::analyze))
        .route("/api/chat", post(api::chat))
        .route("/api/generate-solution", post(api::generate_solution))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
