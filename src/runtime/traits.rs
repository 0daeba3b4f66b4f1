//! Trait abstractions for runtime I/O
//!
//! The orchestrator talks to the model through `LlmClient` so tests can
//! swap in mocks. History storage and tool dispatch have their own seams
//! (`HistoryStore`, `QueryExecutor`).

use crate::config::ModelPolicy;
use crate::llm::{LlmError, LlmRequest, LlmResponse, ModelRegistry};
use async_trait::async_trait;
use std::sync::Arc;

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Adapter to use `ModelRegistry` as `LlmClient`
pub struct RegistryLlmClient {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl RegistryLlmClient {
    pub fn new(registry: Arc<ModelRegistry>, model_id: String) -> Self {
        Self { registry, model_id }
    }
}

#[async_trait]
impl LlmClient for RegistryLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let llm = self
            .registry
            .get(&self.model_id)
            .or_else(|| self.registry.default())
            .ok_or_else(|| LlmError::auth("No LLM available"))?;
        llm.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Complete `request` under `policy`: each attempt is bounded by the model
/// timeout, and retryable failures back off exponentially (or by the
/// provider's `retry-after`) until `max_attempts` is spent.
pub async fn complete_with_retry(
    llm: &dyn LlmClient,
    request: &LlmRequest,
    policy: &ModelPolicy,
) -> Result<LlmResponse, LlmError> {
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(policy.timeout, llm.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::timeout(policy.timeout)),
        };

        match result {
            Ok(response) => return Ok(response),
            Err(e) if e.kind.is_retryable() && attempt < policy.max_attempts => {
                let delay = e.retry_after.unwrap_or_else(|| policy.retry_delay(attempt));
                tracing::warn!(
                    model = %llm.model_id(),
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Model call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(model = %llm.model_id(), attempt, error = %e, "Model call failed");
                return Err(e);
            }
        }
    }
}
