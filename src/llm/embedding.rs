//! Text embeddings for semantic search

use super::error::retry_after;
use super::openai::OpenAIErrorResponse;
use super::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Dimension of the stored passage embeddings
pub const EMBEDDING_DIMENSIONS: usize = 1536;

/// Produces a vector for a piece of text
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

/// `OpenAI`-compatible embeddings endpoint
pub struct OpenAIEmbeddings {
    client: Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAIEmbeddings {
    pub fn new(api_key: String, model: impl Into<String>) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            url: EMBEDDINGS_URL.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingService for OpenAIEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let start = std::time::Instant::now();
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions: EMBEDDING_DIMENSIONS,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        let wait = retry_after(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAIErrorResponse>(&body)
                .map_or(body, |e| e.error.message);
            let err = LlmError::from_status(status.as_u16(), &message);
            return Err(match wait {
                Some(d) => err.with_retry_after(d),
                None => err,
            });
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse embedding response: {e}")))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::unknown("No embedding in response"))?;

        if vector.len() != EMBEDDING_DIMENSIONS {
            return Err(LlmError::unknown(format!(
                "Expected {EMBEDDING_DIMENSIONS} dimensions, got {}",
                vector.len()
            )));
        }

        tracing::debug!(
            model = %self.model,
            duration_ms = %start.elapsed().as_millis(),
            "Embedding computed"
        );
        Ok(vector)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
