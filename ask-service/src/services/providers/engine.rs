//! Prompt-to-text completion over a [`LogitsSource`], serialised behind a
//! single lock.

use super::generation::{generate, FinishReason, LogitsSource};
use super::template::ChatTemplate;
use super::ProviderError;
use crate::config::{ModelConfig, SamplingConfig};
use candle_core::Device;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokenizers::Tokenizer;

/// A model together with everything needed to turn a prompt into text.
pub struct Engine<M> {
    model: M,
    tokenizer: Tokenizer,
    device: Device,
    template: ChatTemplate,
    system_prompt: Option<String>,
    sampling: SamplingConfig,
    eos_tokens: Vec<u32>,
}

impl<M: LogitsSource> Engine<M> {
    pub fn new(
        model: M,
        tokenizer: Tokenizer,
        device: Device,
        config: &ModelConfig,
        eos_tokens: Vec<u32>,
    ) -> Self {
        Self {
            model,
            tokenizer,
            device,
            template: config.template,
            system_prompt: config.system_prompt.clone(),
            sampling: config.sampling.clone(),
            eos_tokens,
        }
    }

    fn complete(&mut self, prompt: &str) -> Result<String, ProviderError> {
        let rendered = self.template.render(self.system_prompt.as_deref(), prompt);
        let encoding = self
            .tokenizer
            .encode(rendered, true)
            .map_err(|e| ProviderError::Tokenizer(e.to_string()))?;
        let prompt_tokens = encoding.get_ids();

        let tokenizer = &self.tokenizer;
        let template = self.template;
        let check_stops = !template.stop_sequences().is_empty();

        let started = Instant::now();
        let generation = generate(
            &mut self.model,
            prompt_tokens,
            &self.sampling,
            &self.eos_tokens,
            &self.device,
            |tokens| {
                check_stops
                    && tokenizer
                        .decode(tokens, true)
                        .map(|text| template.hit_stop(&text))
                        .unwrap_or(false)
            },
        )?;

        let text = tokenizer
            .decode(&generation.tokens, true)
            .map_err(|e| ProviderError::Tokenizer(e.to_string()))?;

        let elapsed = started.elapsed();
        tracing::debug!(
            prompt_tokens = prompt_tokens.len(),
            generated_tokens = generation.tokens.len(),
            finish_reason = ?generation.finish_reason,
            tokens_per_second = generation.tokens.len() as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
            "Completion finished"
        );
        if generation.finish_reason == FinishReason::Length {
            tracing::debug!(max_tokens = self.sampling.max_tokens, "Completion truncated");
        }

        Ok(template.truncate_at_stop(&text).to_string())
    }
}

/// Shared handle that runs one completion at a time on a blocking thread.
///
/// The model keeps a mutable KV cache, so each call holds the lock for its
/// whole generation.
pub struct SerialEngine<M> {
    inner: Arc<Mutex<Engine<M>>>,
}

impl<M> Clone for SerialEngine<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: LogitsSource + Send + 'static> SerialEngine<M> {
    pub fn new(engine: Engine<M>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let inner = Arc::clone(&self.inner);
        let prompt = prompt.to_string();

        tokio::task::spawn_blocking(move || {
            // Every completion restarts at position 0, which resets the KV
            // cache, so state left behind by a panicked holder is harmless.
            let mut engine = inner.lock().unwrap_or_else(PoisonError::into_inner);
            engine.complete(&prompt)
        })
        .await
        .map_err(|e| ProviderError::Inference(format!("inference task failed: {}", e)))?
    }
}
