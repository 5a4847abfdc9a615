//! Health and status handlers.

use crate::state::{AppState, ServiceStatus};
use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{trace, warn};

#[derive(Serialize)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    services: BTreeMap<String, ServiceStatus>,
    /// Remaining core-API quota upstream, if it could be fetched.
    github_rate_remaining: Option<u64>,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Status endpoint showing service states and the upstream rate budget.
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let services: BTreeMap<String, ServiceStatus> =
        state.service_statuses.all().into_iter().collect();

    let overall_status = if services
        .values()
        .any(|s| matches!(s, ServiceStatus::Error))
    {
        ServiceStatus::Error
    } else if !services.is_empty()
        && services.values().all(|s| matches!(s, ServiceStatus::Active))
    {
        ServiceStatus::Active
    } else {
        ServiceStatus::Starting
    };

    let github_rate_remaining = match state.github.rate_limit_remaining().await {
        Ok(remaining) => Some(remaining),
        Err(e) => {
            warn!(error = %e, "failed to fetch upstream rate limit");
            None
        }
    };

    Json(StatusResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_owned(),
        services,
        github_rate_remaining,
    })
}
