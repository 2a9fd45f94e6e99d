//! Chat model abstractions and implementations.
//!
//! The HTTP layer only sees [`ChatModel`]; the concrete backend (local GGUF
//! weights or the mock) is chosen once at startup.

pub mod engine;
pub mod generation;
pub mod gguf;
pub mod mock;
pub mod template;

use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

/// Error type for model operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Model not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to load model: {0}")]
    Load(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Inference error: {0}")]
    Inference(String),
}

impl From<candle_core::Error> for ProviderError {
    fn from(err: candle_core::Error) -> Self {
        ProviderError::Inference(err.to_string())
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(_) => AppError::ServiceUnavailable,
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}

/// A model that answers a single prompt with a single completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Human-readable model name, reported by `/health`.
    fn name(&self) -> &str;

    /// Run one chat completion for `prompt`.
    async fn chat_completion(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

pub use gguf::GgufChatModel;
pub use mock::MockChatModel;
