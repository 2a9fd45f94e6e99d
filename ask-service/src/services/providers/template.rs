//! Prompt framing for instruction-tuned models.

use std::fmt;
use std::str::FromStr;

/// How a bare prompt is wrapped before tokenization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatTemplate {
    /// `### Instruction:` / `### Response:` framing used by GPT4All-style models.
    #[default]
    Instruction,
    /// `<|im_start|>` / `<|im_end|>` turns.
    ChatMl,
    /// `[INST] ... [/INST]` turns.
    Llama2,
    /// Prompt passed through untouched.
    Raw,
}

impl ChatTemplate {
    /// Render one user turn, preceded by an optional system prompt, ending
    /// where the assistant is expected to speak.
    pub fn render(&self, system_prompt: Option<&str>, prompt: &str) -> String {
        match self {
            ChatTemplate::Instruction => {
                let mut out = String::new();
                if let Some(system) = system_prompt {
                    out.push_str(system);
                    out.push_str("\n\n");
                }
                out.push_str("### Instruction:\n");
                out.push_str(prompt);
                out.push_str("\n\n### Response:\n");
                out
            }
            ChatTemplate::ChatMl => {
                let mut out = String::new();
                if let Some(system) = system_prompt {
                    out.push_str(&format!("<|im_start|>system\n{}<|im_end|>\n", system));
                }
                out.push_str(&format!(
                    "<|im_start|>user\n{}<|im_end|>\n<|im_start|>assistant\n",
                    prompt
                ));
                out
            }
            ChatTemplate::Llama2 => match system_prompt {
                Some(system) => format!("[INST] <<SYS>>\n{}\n<</SYS>>\n\n{} [/INST]", system, prompt),
                None => format!("[INST] {} [/INST]", prompt),
            },
            ChatTemplate::Raw => match system_prompt {
                Some(system) => format!("{}\n\n{}", system, prompt),
                None => prompt.to_string(),
            },
        }
    }

    /// Text markers that mean the model has started a new turn.
    pub fn stop_sequences(&self) -> &'static [&'static str] {
        match self {
            ChatTemplate::Instruction => &["### Instruction", "### Response"],
            ChatTemplate::ChatMl => &["<|im_end|>", "<|im_start|>"],
            ChatTemplate::Llama2 => &["[INST]"],
            ChatTemplate::Raw => &[],
        }
    }

    /// Special tokens that terminate generation for this framing.
    pub fn stop_tokens(&self) -> &'static [&'static str] {
        match self {
            ChatTemplate::ChatMl => &["<|im_end|>"],
            _ => &[],
        }
    }

    /// Cut `text` at the earliest stop sequence and trim surrounding whitespace.
    pub fn truncate_at_stop<'a>(&self, text: &'a str) -> &'a str {
        let end = self
            .stop_sequences()
            .iter()
            .filter_map(|stop| text.find(stop))
            .min()
            .unwrap_or(text.len());
        text[..end].trim()
    }

    /// Whether `text` already contains a stop sequence.
    pub fn hit_stop(&self, text: &str) -> bool {
        self.stop_sequences().iter().any(|stop| text.contains(stop))
    }
}

impl FromStr for ChatTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "instruction" | "gpt4all" => Ok(ChatTemplate::Instruction),
            "chatml" => Ok(ChatTemplate::ChatMl),
            "llama2" => Ok(ChatTemplate::Llama2),
            "raw" | "none" => Ok(ChatTemplate::Raw),
            other => Err(format!("unknown chat template '{}'", other)),
        }
    }
}

impl fmt::Display for ChatTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChatTemplate::Instruction => "instruction",
            ChatTemplate::ChatMl => "chatml",
            ChatTemplate::Llama2 => "llama2",
            ChatTemplate::Raw => "raw",
        };
        f.write_str(name)
    }
}
