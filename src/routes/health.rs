use crate::routes::types::HealthResponse;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

use super::AppState;

/// Liveness probe. Answers 200 while the process is up; deliberately
/// does not touch the database or the image host.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now(),
        uptime: state.started_at.elapsed().as_secs(),
        environment: state.environment.as_str(),
    };

    Json(response)
}
