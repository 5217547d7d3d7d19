use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::services::get_metrics;
use crate::startup::AppState;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "chat-notification-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: the push provider must be able to take traffic.
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let provider = state.dispatcher.provider();
    provider.health_check().await.map_err(|e| {
        tracing::warn!(provider = provider.name(), error = %e, "Push provider not ready");
        AppError::ServiceUnavailable(e.to_string())
    })?;

    Ok(StatusCode::OK)
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
