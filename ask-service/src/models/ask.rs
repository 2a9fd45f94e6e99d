use serde::{Deserialize, Serialize};

/// Body of `POST /ask`. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    /// Absent and `null` both mean an empty prompt.
    #[serde(default)]
    pub prompt: Option<String>,
}

impl AskRequest {
    pub fn prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_null_prompt_are_empty() {
        let missing: AskRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.prompt(), "");

        let null: AskRequest = serde_json::from_str(r#"{"prompt": null}"#).unwrap();
        assert_eq!(null.prompt(), "");
    }

    #[test]
    fn extra_keys_are_ignored() {
        let req: AskRequest =
            serde_json::from_str(r#"{"prompt": "hello", "temperature": 2}"#).unwrap();
        assert_eq!(req.prompt(), "hello");
    }

    #[test]
    fn non_text_prompt_is_rejected() {
        assert!(serde_json::from_str::<AskRequest>(r#"{"prompt": 42}"#).is_err());
    }
}
