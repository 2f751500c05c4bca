use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::state::AppState;

/// Health check endpoint
#[tracing::instrument]
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Reachability of the scheduler, as the actions see it
#[tracing::instrument(skip(state))]
pub async fn scheduler_health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.jobs.scheduler().health_check().await;
    let code = if status.reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}
