//! API request and response types

use crate::llm::ModelInfo;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Reply to a chat message
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
}

/// Per-dependency health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub cache: &'static str,
}

impl HealthResponse {
    pub fn from_probes(database_ok: bool, cache_ok: bool) -> Self {
        let label = |ok: bool| if ok { "ok" } else { "unavailable" };
        Self {
            status: if database_ok && cache_ok { "ok" } else { "degraded" },
            database: label(database_ok),
            cache: label(cache_ok),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "ok"
    }
}

/// Response for model list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
