//! Router assembly for the redirector.

use crate::state::AppState;
use crate::web::{meta, status};
use axum::Router;
use axum::routing::get;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn create_router(app_state: AppState) -> Router {
    // Everything that is not a service endpoint is a repository path, so the
    // resolution handler is the fallback rather than a route pattern.
    Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .fallback(get(meta::get_meta))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(app_state)
}
