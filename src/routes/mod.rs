//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The edit endpoint is served at both `/edit-image` and `/api/edit-image`
//! so clients written against either path work unchanged. `/healthz` is a
//! bare liveness check. All routes share permissive CORS, request tracing
//! and a body limit sized for data-URI images.

pub mod edit;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/edit-image", get(edit::health).post(edit::edit_image))
        .route("/api/edit-image", get(edit::health).post(edit::edit_image))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
