//! Common types for LLM interactions

use serde::de::DeserializeOwned;
use serde_json::Value;

/// LLM request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub messages: Vec<LlmMessage>,
    /// JSON schema the reply must conform to (structured output)
    pub response_schema: Option<Value>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: Vec::new(),
            response_schema: None,
            max_tokens: None,
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: LlmMessage) -> Self {
        self.messages.push(message);
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub text: String,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// LLM response
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub text: String,
    pub end_turn: bool,
    pub usage: Usage,
}

impl LlmResponse {
    /// Plain text response, mostly for tests
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            end_turn: true,
            usage: Usage::default(),
        }
    }

    /// Decode a structured-output reply.
    ///
    /// Tolerates a fenced ```json block, which some providers emit even
    /// when a response schema is set.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let trimmed = self.text.trim();
        let body = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|rest| rest.strip_suffix("```"))
            .map_or(trimmed, str::trim);
        serde_json::from_str(body)
    }
}

/// Usage statistics
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        reply: String,
    }

    #[test]
    fn test_json_plain() {
        let resp = LlmResponse::from_text(r#"{"reply":"ok"}"#);
        assert_eq!(resp.json::<Reply>().unwrap(), Reply { reply: "ok".into() });
    }

    #[test]
    fn test_json_fenced() {
        let resp = LlmResponse::from_text("```json\n{\"reply\":\"ok\"}\n```");
        assert_eq!(resp.json::<Reply>().unwrap().reply, "ok");
    }

    #[test]
    fn test_json_rejects_prose() {
        let resp = LlmResponse::from_text("Sure! Here is your answer.");
        assert!(resp.json::<Reply>().is_err());
    }
}
