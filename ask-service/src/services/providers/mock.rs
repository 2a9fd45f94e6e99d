//! Mock chat model for tests and weight-less local runs.

use super::{ChatModel, ProviderError};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockMode {
    Echo,
    Disabled,
    Failing,
}

/// Answers `Mock response for: <prompt>`.
pub struct MockChatModel {
    mode: MockMode,
}

impl MockChatModel {
    pub fn new(enabled: bool) -> Self {
        let mode = if enabled {
            MockMode::Echo
        } else {
            MockMode::Disabled
        };
        Self { mode }
    }

    /// A model whose every completion fails with an inference error.
    pub fn failing() -> Self {
        Self {
            mode: MockMode::Failing,
        }
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat_completion(&self, prompt: &str) -> Result<String, ProviderError> {
        match self.mode {
            MockMode::Echo => Ok(format!("Mock response for: {}", prompt)),
            MockMode::Disabled => Err(ProviderError::NotConfigured(
                "Mock chat model not enabled".to_string(),
            )),
            MockMode::Failing => Err(ProviderError::Inference(
                "mock inference failure".to_string(),
            )),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match self.mode {
            MockMode::Disabled => Err(ProviderError::NotConfigured(
                "Mock chat model not enabled".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
