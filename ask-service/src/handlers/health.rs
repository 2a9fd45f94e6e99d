use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness: the process is up and a model is loaded.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "ask-service",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.model.name(),
        "template": state.config.model.template.to_string()
    }))
}

/// Readiness: the model reports itself able to serve completions.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.model.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Model not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
