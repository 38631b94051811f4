use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::services::ServeDir;

use crate::app_state::AppState;

use super::handlers;

pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/emotion", get(handlers::emotion))
        .route("/state", get(handlers::state))
        .route("/frame", get(handlers::frame))
        .route("/stream", get(handlers::stream))
        .nest_service("/static", static_dir)
        .with_state(state)
}
