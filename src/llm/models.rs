//! Centralized model definitions for all LLM providers

use super::gemini::GeminiModel;
use super::openai::OpenAIModel;
use super::{GeminiService, LlmService, OpenAIService};
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
    OpenAI,
}

impl Provider {
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Gemini => "Google Gemini",
            Provider::OpenAI => "OpenAI",
        }
    }
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "gemini-2.0-flash")
    pub id: &'static str,
    pub provider: Provider,
    pub description: &'static str,
    /// Factory function to create the service from an API key
    pub factory: fn(&str) -> Result<Arc<dyn LlmService>, String>,
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gemini-2.0-flash",
            provider: Provider::Gemini,
            description: "Gemini 2.0 Flash (fast, structured output)",
            factory: |api_key| {
                Ok(Arc::new(GeminiService::new(
                    api_key.to_string(),
                    GeminiModel::Gemini20Flash,
                )?))
            },
        },
        ModelDef {
            id: "gemini-2.5-flash",
            provider: Provider::Gemini,
            description: "Gemini 2.5 Flash (balanced)",
            factory: |api_key| {
                Ok(Arc::new(GeminiService::new(
                    api_key.to_string(),
                    GeminiModel::Gemini25Flash,
                )?))
            },
        },
        ModelDef {
            id: "gemini-2.5-pro",
            provider: Provider::Gemini,
            description: "Gemini 2.5 Pro (most capable, slower)",
            factory: |api_key| {
                Ok(Arc::new(GeminiService::new(
                    api_key.to_string(),
                    GeminiModel::Gemini25Pro,
                )?))
            },
        },
        ModelDef {
            id: "gpt-4o",
            provider: Provider::OpenAI,
            description: "GPT-4o",
            factory: |api_key| {
                Ok(Arc::new(OpenAIService::new(
                    api_key.to_string(),
                    OpenAIModel::GPT4o,
                )?))
            },
        },
        ModelDef {
            id: "gpt-4o-mini",
            provider: Provider::OpenAI,
            description: "GPT-4o mini (fast, inexpensive)",
            factory: |api_key| {
                Ok(Arc::new(OpenAIService::new(
                    api_key.to_string(),
                    OpenAIModel::GPT4oMini,
                )?))
            },
        },
        ModelDef {
            id: "gpt-4.1-mini",
            provider: Provider::OpenAI,
            description: "GPT-4.1 mini (long context)",
            factory: |api_key| {
                Ok(Arc::new(OpenAIService::new(
                    api_key.to_string(),
                    OpenAIModel::GPT41Mini,
                )?))
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_model_ids_unique() {
        let ids: HashSet<_> = all_models().iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), all_models().len());
    }

    #[test]
    fn test_factory_model_id_matches_definition() {
        for def in all_models() {
            let service = (def.factory)("test-key").unwrap();
            assert_eq!(service.model_id(), def.id);
            assert!(service.context_window() > 0);
        }
    }
}
