//! Token-by-token sampling loop that drives the GGUF model.

use super::ProviderError;
use crate::config::SamplingConfig;
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama;

/// Anything that maps a token window to next-token logits while keeping its
/// own KV cache. Feeding at `index_pos == 0` starts a fresh sequence.
pub trait LogitsSource {
    /// Logits for the last position of `input` (shape `[1, seq]`), returned
    /// as `[1, vocab]`.
    fn next_logits(&mut self, input: &Tensor, index_pos: usize) -> candle_core::Result<Tensor>;
}

impl LogitsSource for quantized_llama::ModelWeights {
    fn next_logits(&mut self, input: &Tensor, index_pos: usize) -> candle_core::Result<Tensor> {
        self.forward(input, index_pos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The model emitted an end-of-sequence token.
    Eos,
    /// `max_tokens` was reached.
    Length,
    /// The caller's stop check fired.
    Stop,
}

#[derive(Debug)]
pub struct Generation {
    /// Generated tokens, excluding the prompt and any end-of-sequence token.
    pub tokens: Vec<u32>,
    pub finish_reason: FinishReason,
}

/// Run the prompt through `model`, then sample until an end-of-sequence
/// token, `max_tokens`, or `should_stop` returns true for the tokens so far.
pub fn generate<M, S>(
    model: &mut M,
    prompt_tokens: &[u32],
    sampling: &SamplingConfig,
    eos_tokens: &[u32],
    device: &Device,
    mut should_stop: S,
) -> Result<Generation, ProviderError>
where
    M: LogitsSource,
    S: FnMut(&[u32]) -> bool,
{
    if prompt_tokens.is_empty() || sampling.max_tokens == 0 {
        return Ok(Generation {
            tokens: Vec::new(),
            finish_reason: FinishReason::Length,
        });
    }

    let temperature = (sampling.temperature > 0.0).then_some(sampling.temperature);
    let mut logits_processor = LogitsProcessor::new(sampling.seed, temperature, sampling.top_p);

    let mut context = prompt_tokens.to_vec();
    let mut generated = Vec::with_capacity(sampling.max_tokens);

    let input = Tensor::new(prompt_tokens, device)?.unsqueeze(0)?;
    let mut logits = model.next_logits(&input, 0)?;

    loop {
        let next = sample(&mut logits_processor, &logits, &context, sampling)?;
        if eos_tokens.contains(&next) {
            return Ok(Generation {
                tokens: generated,
                finish_reason: FinishReason::Eos,
            });
        }

        generated.push(next);
        context.push(next);

        if should_stop(&generated) {
            return Ok(Generation {
                tokens: generated,
                finish_reason: FinishReason::Stop,
            });
        }
        if generated.len() >= sampling.max_tokens {
            return Ok(Generation {
                tokens: generated,
                finish_reason: FinishReason::Length,
            });
        }

        let input = Tensor::new(&[next], device)?.unsqueeze(0)?;
        logits = model.next_logits(&input, context.len() - 1)?;
    }
}

fn sample(
    logits_processor: &mut LogitsProcessor,
    logits: &Tensor,
    context: &[u32],
    sampling: &SamplingConfig,
) -> Result<u32, ProviderError> {
    let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;
    let logits = if sampling.repeat_penalty == 1.0 || sampling.repeat_last_n == 0 {
        logits
    } else {
        let start = context.len().saturating_sub(sampling.repeat_last_n);
        candle_transformers::utils::apply_repeat_penalty(
            &logits,
            sampling.repeat_penalty,
            &context[start..],
        )?
    };
    Ok(logits_processor.sample(&logits)?)
}
