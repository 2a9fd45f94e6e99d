//! Local quantized llama-family model loaded from a GGUF weights file.

use super::engine::{Engine, SerialEngine};
use super::template::ChatTemplate;
use super::{ChatModel, ProviderError};
use crate::config::ModelConfig;
use async_trait::async_trait;
use candle_core::quantized::gguf_file;
use candle_core::Device;
use candle_transformers::models::quantized_llama::ModelWeights;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;

/// Tokens treated as end-of-sequence when the weights file does not name one.
const FALLBACK_EOS_TOKENS: &[&str] = &["</s>", "<|endoftext|>", "<|eot_id|>"];

/// Chat model backed by GGUF weights and a `tokenizer.json`.
pub struct GgufChatModel {
    name: String,
    engine: SerialEngine<ModelWeights>,
}

impl GgufChatModel {
    /// Load weights and tokenizer. Blocking; reads the whole weights file.
    pub fn load(config: &ModelConfig) -> Result<Self, ProviderError> {
        let device = select_device();
        let weights_path = config.weights_path.as_path();

        let mut file = File::open(weights_path)
            .map_err(|e| ProviderError::Load(format!("{}: {}", weights_path.display(), e)))?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| ProviderError::Load(e.with_path(weights_path).to_string()))?;

        let metadata_eos = content
            .metadata
            .get("tokenizer.ggml.eos_token_id")
            .and_then(|v| v.to_u32().ok());
        let name = content
            .metadata
            .get("general.name")
            .and_then(|v| v.to_string().ok())
            .cloned()
            .unwrap_or_else(|| file_stem(weights_path));

        let started = Instant::now();
        let model = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(|e| ProviderError::Load(e.to_string()))?;

        let tokenizer = Tokenizer::from_file(&config.tokenizer_path).map_err(|e| {
            ProviderError::Load(format!("{}: {}", config.tokenizer_path.display(), e))
        })?;

        let eos_tokens = resolve_eos_tokens(&tokenizer, metadata_eos, config.template);
        if eos_tokens.is_empty() {
            tracing::warn!(
                model = %name,
                "No end-of-sequence token found, completions will run to max_tokens"
            );
        }

        tracing::info!(
            model = %name,
            device = ?device,
            template = %config.template,
            eos_tokens = ?eos_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded GGUF model"
        );

        let engine = Engine::new(model, tokenizer, device, config, eos_tokens);
        Ok(Self {
            name,
            engine: SerialEngine::new(engine),
        })
    }
}

#[async_trait]
impl ChatModel for GgufChatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat_completion(&self, prompt: &str) -> Result<String, ProviderError> {
        self.engine.complete(prompt).await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

fn select_device() -> Device {
    if candle_core::utils::metal_is_available() {
        match Device::new_metal(0) {
            Ok(device) => return device,
            Err(e) => tracing::warn!("Failed to initialize Metal: {}, trying CUDA", e),
        }
    }
    if candle_core::utils::cuda_is_available() {
        match Device::new_cuda(0) {
            Ok(device) => return device,
            Err(e) => tracing::warn!("Failed to initialize CUDA: {}, falling back to CPU", e),
        }
    }
    Device::Cpu
}

fn resolve_eos_tokens(
    tokenizer: &Tokenizer,
    metadata_eos: Option<u32>,
    template: ChatTemplate,
) -> Vec<u32> {
    let mut eos: Vec<u32> = metadata_eos.into_iter().collect();
    if eos.is_empty() {
        eos.extend(
            FALLBACK_EOS_TOKENS
                .iter()
                .filter_map(|token| tokenizer.token_to_id(token)),
        );
    }
    for token in template.stop_tokens() {
        if let Some(id) = tokenizer.token_to_id(token) {
            if !eos.contains(&id) {
                eos.push(id);
            }
        }
    }
    eos
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gguf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelBackend, SamplingConfig};
    use crate::services::providers::engine::tests::word_tokenizer;
    use std::path::PathBuf;

    #[test]
    fn missing_weights_file_is_a_load_error() {
        let config = ModelConfig {
            backend: ModelBackend::Gguf,
            weights_path: PathBuf::from("does/not/exist.gguf"),
            tokenizer_path: PathBuf::from("does/not/exist.json"),
            template: ChatTemplate::default(),
            system_prompt: None,
            sampling: SamplingConfig::default(),
        };

        match GgufChatModel::load(&config) {
            Err(ProviderError::Load(msg)) => assert!(msg.contains("exist.gguf")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("load should fail without a weights file"),
        }
    }

    #[test]
    fn metadata_eos_wins_over_fallback_names() {
        let tokenizer = word_tokenizer();

        assert_eq!(resolve_eos_tokens(&tokenizer, Some(2), ChatTemplate::Raw), vec![2]);
        assert_eq!(resolve_eos_tokens(&tokenizer, None, ChatTemplate::Raw), vec![4]);
    }

    #[test]
    fn template_stop_tokens_are_merged_once() {
        let tokenizer = word_tokenizer();

        assert_eq!(resolve_eos_tokens(&tokenizer, Some(4), ChatTemplate::ChatMl), vec![4, 5]);
        assert_eq!(resolve_eos_tokens(&tokenizer, Some(5), ChatTemplate::ChatMl), vec![5]);
    }

    #[test]
    fn file_stem_names_model_after_weights() {
        assert_eq!(
            file_stem(Path::new("models/ggml-gpt4all-j-v1.3-groovy.gguf")),
            "ggml-gpt4all-j-v1.3-groovy"
        );
    }
}
