//! Shared state and router setup.
use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::workflows::Studio;

pub struct AppState {
    pub studio: Studio,
    pub max_upload_bytes: usize,
}

/// Build the application router. Files under `static_dir` (generated output,
/// textures) are served at `/static`.
pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/background", get(handlers::background_page).post(handlers::background_submit))
        .route("/flooring", get(handlers::flooring_page).post(handlers::flooring_submit))
        .route("/product-color", get(handlers::product_color_page).post(handlers::product_color_submit))
        .route("/multi-color", get(handlers::multi_color_page).post(handlers::multi_color_submit))
        .route("/modify-detected-color", post(handlers::modify_detected_color))
        .route("/object-change", get(handlers::object_change_page).post(handlers::object_change_submit))
        .route("/product-replace", get(handlers::product_replace_page).post(handlers::product_replace_analyze))
        .route("/product-replace/replace", post(handlers::product_replace_action))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
