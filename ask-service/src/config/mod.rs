use crate::services::providers::template::ChatTemplate;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Port the service listens on unless `APP__PORT` says otherwise.
pub const DEFAULT_PORT: u16 = 5005;

const DEFAULT_MODEL_PATH: &str = "models/model.gguf";
const DEFAULT_TOKENIZER_PATH: &str = "models/tokenizer.json";
const DEFAULT_MAX_TOKENS: usize = 256;
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_SEED: u64 = 299_792_458;
const DEFAULT_REPEAT_PENALTY: f32 = 1.1;
const DEFAULT_REPEAT_LAST_N: usize = 64;

#[derive(Debug, Clone)]
pub struct AskConfig {
    pub common: core_config::Config,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelBackend {
    /// Quantized GGUF weights run in-process.
    Gguf,
    /// Echo model; needs no weights.
    Mock,
}

impl FromStr for ModelBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gguf" => Ok(ModelBackend::Gguf),
            "mock" => Ok(ModelBackend::Mock),
            other => Err(format!("unknown model backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    pub weights_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub template: ChatTemplate,
    pub system_prompt: Option<String>,
    pub sampling: SamplingConfig,
}

/// Generation settings applied to every chat completion.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub max_tokens: usize,
    /// Zero or below means greedy decoding.
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub seed: u64,
    /// 1.0 disables the penalty.
    pub repeat_penalty: f32,
    pub repeat_last_n: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: None,
            seed: DEFAULT_SEED,
            repeat_penalty: DEFAULT_REPEAT_PENALTY,
            repeat_last_n: DEFAULT_REPEAT_LAST_N,
        }
    }
}

impl AskConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load(DEFAULT_PORT)?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build the model section from an arbitrary key lookup.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()) == "prod";
        let env = EnvReader { lookup, is_prod };

        let backend = env.parse("ASK_MODEL_BACKEND", ModelBackend::Gguf)?;
        let defaults = SamplingConfig::default();

        // The mock backend never opens these files.
        let model_file = |key: &str, default: &str| -> Result<PathBuf, AppError> {
            match backend {
                ModelBackend::Gguf => env.required(key, default).map(PathBuf::from),
                ModelBackend::Mock => Ok(env
                    .optional(key)
                    .unwrap_or_else(|| default.to_string())
                    .into()),
            }
        };

        Ok(AskConfig {
            common,
            model: ModelConfig {
                backend,
                weights_path: model_file("ASK_MODEL_PATH", DEFAULT_MODEL_PATH)?,
                tokenizer_path: model_file("ASK_TOKENIZER_PATH", DEFAULT_TOKENIZER_PATH)?,
                template: env.parse("ASK_CHAT_TEMPLATE", ChatTemplate::default())?,
                system_prompt: env.optional("ASK_SYSTEM_PROMPT"),
                sampling: SamplingConfig {
                    max_tokens: env.parse("ASK_MAX_TOKENS", defaults.max_tokens)?,
                    temperature: env.parse("ASK_TEMPERATURE", defaults.temperature)?,
                    top_p: env
                        .optional("ASK_TOP_P")
                        .map(|v| parse_value("ASK_TOP_P", &v))
                        .transpose()?,
                    seed: env.parse("ASK_SEED", defaults.seed)?,
                    repeat_penalty: env.parse("ASK_REPEAT_PENALTY", defaults.repeat_penalty)?,
                    repeat_last_n: env.parse("ASK_REPEAT_LAST_N", defaults.repeat_last_n)?,
                },
            },
        })
    }
}

struct EnvReader<F> {
    lookup: F,
    is_prod: bool,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Falls back to `default` outside production; in production the key
    /// must be set explicitly.
    fn required(&self, key: &str, default: &str) -> Result<String, AppError> {
        match self.optional(key) {
            Some(val) => Ok(val),
            None if self.is_prod => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required in production but not set",
                key
            ))),
            None => Ok(default.to_string()),
        }
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            Some(raw) => parse_value(key, &raw),
            None => Ok(default),
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("invalid value '{}' for {}: {}", raw, key, e))
    })
}
