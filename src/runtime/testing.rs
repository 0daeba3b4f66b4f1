//! Mock implementations for testing
//!
//! These mocks enable orchestration tests without Redis, Postgres or a
//! model provider.

use super::traits::LlmClient;
use crate::catalog::{ToolInvocation, ToolName};
use crate::config::HistoryConfig;
use crate::history::{HistoryError, HistoryStore, InMemoryHistory, SessionId, Turn};
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use crate::query::{QueryExecutor, ToolFailed, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a response whose text is `value` serialized as JSON
    pub fn queue_json(&self, value: &Value) {
        self.queue_response(LlmResponse::from_text(value.to_string()));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock History
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Healthy,
    /// Every call fails as if the store were unreachable
    Unavailable,
    /// Loads succeed, appends fail
    ReadOnly,
}

/// In-memory history that can be switched into failure modes
pub struct MockHistory {
    inner: InMemoryHistory,
    mode: Mutex<HistoryMode>,
    /// Batches passed to `append_turns`, successful or not
    pub appends: Mutex<Vec<(SessionId, Vec<Turn>)>>,
}

impl MockHistory {
    pub fn new() -> Self {
        Self::with_mode(HistoryMode::Healthy)
    }

    pub fn unavailable() -> Self {
        Self::with_mode(HistoryMode::Unavailable)
    }

    pub fn with_mode(mode: HistoryMode) -> Self {
        Self {
            inner: InMemoryHistory::new(HistoryConfig::default()),
            mode: Mutex::new(mode),
            appends: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: HistoryMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn recorded_appends(&self) -> Vec<(SessionId, Vec<Turn>)> {
        self.appends.lock().unwrap().clone()
    }

    fn mode(&self) -> HistoryMode {
        *self.mode.lock().unwrap()
    }
}

impl Default for MockHistory {
    fn default() -> Self {
        Self::new()
    }
}

fn unreachable_store() -> HistoryError {
    HistoryError::StoreUnavailable("connection refused".to_string())
}

#[async_trait]
impl HistoryStore for MockHistory {
    async fn load(&self, session: &SessionId) -> Result<Vec<Turn>, HistoryError> {
        match self.mode() {
            HistoryMode::Unavailable => Err(unreachable_store()),
            HistoryMode::Healthy | HistoryMode::ReadOnly => self.inner.load(session).await,
        }
    }

    async fn append_turns(&self, session: &SessionId, turns: &[Turn]) -> Result<(), HistoryError> {
        self.appends
            .lock()
            .unwrap()
            .push((session.clone(), turns.to_vec()));
        match self.mode() {
            HistoryMode::Healthy => self.inner.append_turns(session, turns).await,
            HistoryMode::Unavailable | HistoryMode::ReadOnly => Err(unreachable_store()),
        }
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        match self.mode() {
            HistoryMode::Unavailable => Err(unreachable_store()),
            HistoryMode::Healthy | HistoryMode::ReadOnly => Ok(()),
        }
    }
}

// ============================================================================
// Mock Query Executor
// ============================================================================

/// Executor with a canned outcome that records every invocation
pub struct MockQueryExecutor {
    tool: ToolName,
    outcome: Result<ToolResult, ToolFailed>,
    /// Record of invocations received
    pub invocations: Mutex<Vec<ToolInvocation>>,
}

impl MockQueryExecutor {
    pub fn returning(result: ToolResult) -> Self {
        Self {
            tool: result.tool,
            outcome: Ok(result),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(tool: ToolName, reason: impl Into<String>) -> Self {
        Self {
            tool,
            outcome: Err(ToolFailed::new(tool, reason)),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for MockQueryExecutor {
    fn tool(&self) -> ToolName {
        self.tool
    }

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolFailed> {
        self.invocations.lock().unwrap().push(invocation.clone());
        self.outcome.clone()
    }
}
