//! Intent selection
//!
//! One schema-constrained model call turns the user's message into exactly
//! one `Intent`. Whatever the model does, `select` returns an intent: bad
//! output gets one corrective retry, missing required parameters become a
//! clarifying question, and exhausted retries become a fixed apology.

use crate::calendar::DateContext;
use crate::catalog::{ParamError, ToolCatalog, ToolInvocation, ToolName};
use crate::config::ModelPolicy;
use crate::history::Turn;
use crate::llm::{LlmError, LlmErrorKind, LlmMessage, LlmRequest};
use crate::runtime::{complete_with_retry, LlmClient};
use crate::system_prompt::{history_messages, intent_prompt};
use crate::text::Language;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

const APOLOGY_EN: &str =
    "I encountered an issue trying to understand your request. Could you please rephrase it?";
const APOLOGY_EL: &str = "Αντιμετώπισα ένα πρόβλημα στην κατανόηση του αιτήματός σας. Θα μπορούσατε να το διατυπώσετε διαφορετικά;";

const FALLBACK_QUESTION_EN: &str = "Could you give me a few more details about what you are looking for?";
const FALLBACK_QUESTION_EL: &str = "Θα μπορούσατε να μου δώσετε λίγες περισσότερες λεπτομέρειες για το τι αναζητάτε;";

/// What to do with the user's message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    DirectAnswer(String),
    ToolCall(ToolInvocation),
    Clarify(String),
}

#[derive(Debug, Error)]
enum IntentError {
    #[error("model error: {0}")]
    Model(#[from] LlmError),
    #[error("invalid intent: {reason}")]
    SchemaViolation { output: String, reason: String },
    #[error("{tool} needs `{param}`")]
    MissingParameter { tool: ToolName, param: &'static str },
}

/// Model reply before validation
#[derive(Debug, Deserialize)]
struct RawIntent {
    kind: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

pub struct IntentSelector {
    llm: Arc<dyn LlmClient>,
    catalog: ToolCatalog,
    policy: ModelPolicy,
    context_turns: usize,
}

impl IntentSelector {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        catalog: ToolCatalog,
        policy: ModelPolicy,
        context_turns: usize,
    ) -> Self {
        Self {
            llm,
            catalog,
            policy,
            context_turns,
        }
    }

    /// Select exactly one intent for `utterance`
    pub async fn select(&self, utterance: &str, history: &[Turn], dates: &DateContext) -> Intent {
        let language = Language::detect(utterance);
        let base = self.request(utterance, history, dates);
        let mut request = base.clone();
        let mut corrected = false;

        loop {
            match self.attempt(&request).await {
                Ok(intent) => {
                    tracing::info!(intent = label(&intent), corrected, "Intent selected");
                    return intent;
                }
                Err(IntentError::MissingParameter { tool, param }) => {
                    tracing::info!(tool = %tool, param, "Required parameter missing, asking the user");
                    return Intent::Clarify(self.question(tool, param, language));
                }
                Err(IntentError::SchemaViolation { output, reason }) if !corrected => {
                    tracing::warn!(reason = %reason, "Intent reply violated the schema, retrying once");
                    corrected = true;
                    request = base
                        .clone()
                        .with_message(LlmMessage::assistant(output))
                        .with_message(LlmMessage::user(format!(
                            "Your previous reply was invalid: {reason}. \
                             Reply again with a single JSON object that follows the schema."
                        )));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Intent selection failed, apologising");
                    return Intent::DirectAnswer(language.pick(APOLOGY_EL, APOLOGY_EN).to_string());
                }
            }
        }
    }

    fn request(&self, utterance: &str, history: &[Turn], dates: &DateContext) -> LlmRequest {
        let mut request = LlmRequest::new(intent_prompt(&self.catalog, dates))
            .with_schema(self.catalog.intent_schema())
            .with_temperature(0.0);
        for message in history_messages(history, self.context_turns) {
            request = request.with_message(message);
        }
        request.with_message(LlmMessage::user(utterance))
    }

    async fn attempt(&self, request: &LlmRequest) -> Result<Intent, IntentError> {
        let response = match complete_with_retry(self.llm.as_ref(), request, &self.policy).await {
            Ok(response) => response,
            Err(e) if e.kind == LlmErrorKind::EmptyResponse => {
                return Err(IntentError::SchemaViolation {
                    output: String::new(),
                    reason: "the reply was empty".to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let raw: RawIntent = response.json().map_err(|e| IntentError::SchemaViolation {
            output: response.text.clone(),
            reason: format!("not a valid intent object ({e})"),
        })?;
        validate(raw).map_err(|reason| match reason {
            Invalid::Missing { tool, param } => IntentError::MissingParameter { tool, param },
            Invalid::Schema(reason) => IntentError::SchemaViolation {
                output: response.text.clone(),
                reason,
            },
        })
    }

    fn question(&self, tool: ToolName, param: &str, language: Language) -> String {
        self.catalog
            .get(tool)
            .and_then(|t| t.param(param))
            .and_then(|p| p.question)
            .map_or_else(
                || language.pick(FALLBACK_QUESTION_EL, FALLBACK_QUESTION_EN).to_string(),
                |q| language.pick(q.el, q.en).to_string(),
            )
    }
}

enum Invalid {
    Missing { tool: ToolName, param: &'static str },
    Schema(String),
}

fn validate(raw: RawIntent) -> Result<Intent, Invalid> {
    let text = raw.text.trim().to_string();
    match raw.kind.as_str() {
        "direct_answer" | "clarify" if text.is_empty() => {
            Err(Invalid::Schema(format!("`{}` requires a non-empty text", raw.kind)))
        }
        "direct_answer" => Ok(Intent::DirectAnswer(text)),
        "clarify" => Ok(Intent::Clarify(text)),
        "tool_call" => {
            let name = raw
                .tool
                .as_deref()
                .ok_or_else(|| Invalid::Schema("`tool_call` requires a tool".to_string()))?;
            let tool = ToolName::parse(name.trim())
                .ok_or_else(|| Invalid::Schema(format!("unknown tool `{name}`")))?;
            let arguments = raw.arguments.unwrap_or(Value::Null);
            match ToolInvocation::parse(tool, &arguments) {
                Ok(invocation) => Ok(Intent::ToolCall(invocation)),
                Err(ParamError::Missing { tool, param }) => Err(Invalid::Missing { tool, param }),
                Err(e) => Err(Invalid::Schema(e.to_string())),
            }
        }
        other => Err(Invalid::Schema(format!("unknown kind `{other}`"))),
    }
}

fn label(intent: &Intent) -> &'static str {
    match intent {
        Intent::DirectAnswer(_) => "direct_answer",
        Intent::ToolCall(invocation) => invocation.tool_name().as_str(),
        Intent::Clarify(_) => "clarify",
    }
}
