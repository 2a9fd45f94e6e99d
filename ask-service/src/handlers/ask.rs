use crate::models::{AskRequest, AskResponse};
use crate::services::record_inference;
use crate::startup::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;
use std::time::Instant;

/// `POST /ask`: one chat completion per request.
pub async fn ask(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let prompt = payload.prompt();
    tracing::info!(
        model = %state.model.name(),
        prompt_chars = prompt.chars().count(),
        "Ask request received"
    );

    let started = Instant::now();
    let result = state.model.chat_completion(prompt).await;
    let elapsed = started.elapsed();
    record_inference(state.model.name(), elapsed, result.is_ok());

    let response = result.map_err(|e| {
        tracing::error!(error = %e, "Chat completion failed");
        AppError::from(e)
    })?;

    tracing::info!(
        response_chars = response.chars().count(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Ask request completed"
    );

    Ok(Json(AskResponse { response }))
}
