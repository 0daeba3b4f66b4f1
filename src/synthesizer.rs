//! Reply synthesis
//!
//! Turns the selected intent, plus tool data when a tool ran, into the
//! single user-facing reply. Direct answers and clarifying questions pass
//! through untouched; tool outcomes go through one grounded model call.

use crate::calendar::DateContext;
use crate::config::ModelPolicy;
use crate::history::Turn;
use crate::llm::{LlmError, LlmErrorKind, LlmMessage, LlmRequest};
use crate::query::{ToolFailed, ToolResult};
use crate::runtime::{complete_with_retry, LlmClient};
use crate::system_prompt::{history_messages, synthesis_prompt};
use crate::text::Language;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Marker handed to the model when the tool matched nothing
pub const NO_RESULTS: &str = "NO_RESULTS";
/// Marker handed to the model when the tool could not run
pub const DATA_UNAVAILABLE: &str = "DATA_UNAVAILABLE";

const APOLOGY_EN: &str = "I found some information, but encountered an issue while putting together the final response. Please try again.";
const APOLOGY_EL: &str = "Βρήκα κάποιες πληροφορίες, αλλά αντιμετώπισα ένα πρόβλημα κατά τη σύνταξη της τελικής απάντησης. Παρακαλώ δοκιμάστε ξανά.";

/// What the reply is grounded on
#[derive(Debug, Clone, PartialEq)]
pub enum Grounding {
    Direct(String),
    Clarify(String),
    Tool(ToolResult),
    ToolFailed(ToolFailed),
}

impl Grounding {
    fn data_section(&self) -> Option<String> {
        match self {
            Grounding::Direct(_) | Grounding::Clarify(_) => None,
            Grounding::Tool(result) if result.is_empty() => {
                Some(format!("{NO_RESULTS}\n{}", result.render()))
            }
            Grounding::Tool(result) => Some(result.render()),
            Grounding::ToolFailed(_) => Some(DATA_UNAVAILABLE.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub reply: String,
    /// The reply is the fixed apology, not a real answer
    pub fell_back: bool,
}

#[derive(Debug, Deserialize)]
struct RawReply {
    reply: String,
}

pub struct ResponseSynthesizer {
    llm: Arc<dyn LlmClient>,
    policy: ModelPolicy,
    context_turns: usize,
}

impl ResponseSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, policy: ModelPolicy, context_turns: usize) -> Self {
        Self {
            llm,
            policy,
            context_turns,
        }
    }

    pub async fn synthesize(
        &self,
        utterance: &str,
        history: &[Turn],
        grounding: &Grounding,
        dates: &DateContext,
    ) -> Synthesis {
        let data = match grounding {
            Grounding::Direct(text) | Grounding::Clarify(text) => {
                return Synthesis {
                    reply: text.clone(),
                    fell_back: false,
                }
            }
            _ => grounding.data_section().unwrap_or_default(),
        };

        let mut base = LlmRequest::new(synthesis_prompt(dates)).with_schema(reply_schema());
        for message in history_messages(history, self.context_turns) {
            base = base.with_message(message);
        }
        let base = base.with_message(LlmMessage::user(format!(
            "Question: {utterance}\n\nDATA:\n{data}"
        )));

        let mut request = base.clone();
        let mut corrected = false;
        loop {
            match self.attempt(&request).await {
                Ok(Ok(reply)) => {
                    tracing::info!(corrected, chars = reply.chars().count(), "Reply synthesized");
                    return Synthesis {
                        reply,
                        fell_back: false,
                    };
                }
                Ok(Err(output)) if !corrected => {
                    tracing::warn!("Synthesis reply was empty or malformed, retrying once");
                    corrected = true;
                    request = base
                        .clone()
                        .with_message(LlmMessage::assistant(output))
                        .with_message(LlmMessage::user(
                            "Your previous reply was empty or not valid JSON. \
                             Reply again with {\"reply\": \"...\"} containing the full answer.",
                        ));
                }
                Ok(Err(_)) => {
                    tracing::warn!("Synthesis reply invalid after correction, falling back");
                    return fallback(utterance);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Synthesis failed, falling back");
                    return fallback(utterance);
                }
            }
        }
    }

    /// `Ok(Err(output))` is a reply that came back but is unusable
    async fn attempt(&self, request: &LlmRequest) -> Result<Result<String, String>, LlmError> {
        let response = match complete_with_retry(self.llm.as_ref(), request, &self.policy).await {
            Ok(response) => response,
            Err(e) if e.kind == LlmErrorKind::EmptyResponse => return Ok(Err(String::new())),
            Err(e) => return Err(e),
        };
        Ok(match response.json::<RawReply>() {
            Ok(raw) if !raw.reply.trim().is_empty() => Ok(raw.reply.trim().to_string()),
            _ => Err(response.text),
        })
    }
}

fn fallback(utterance: &str) -> Synthesis {
    Synthesis {
        reply: Language::detect(utterance).pick(APOLOGY_EL, APOLOGY_EN).to_string(),
        fell_back: true,
    }
}

fn reply_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "reply": {"type": "string", "description": "The answer shown to the user."}
        },
        "required": ["reply"]
    })
}
