//! Per-message orchestration

use super::traits::LlmClient;
use crate::calendar::DateContext;
use crate::catalog::ToolCatalog;
use crate::config::ModelPolicy;
use crate::history::{HistoryStore, SessionId, Turn};
use crate::intent::IntentSelector;
use crate::query::QueryRegistry;
use crate::state_machine::{transition, Effect, Event, TurnContext, TurnState};
use crate::synthesizer::ResponseSynthesizer;
use crate::text::expand_abbreviations;
use chrono::{TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// What the caller gets back for one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub session_id: String,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("internal error: {0}")]
    Internal(String),
}

pub struct Orchestrator {
    history: Arc<dyn HistoryStore>,
    intents: IntentSelector,
    queries: QueryRegistry,
    synthesizer: ResponseSynthesizer,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        history: Arc<dyn HistoryStore>,
        queries: QueryRegistry,
        policy: ModelPolicy,
        context_turns: usize,
    ) -> Self {
        Self {
            history,
            intents: IntentSelector::new(llm.clone(), ToolCatalog::default(), policy, context_turns),
            queries,
            synthesizer: ResponseSynthesizer::new(llm, policy, context_turns),
        }
    }

    /// Handle one user message. Apart from an empty message, this always
    /// produces a reply; degraded dependencies only change its content.
    pub async fn submit_message(
        &self,
        session_id: Option<&str>,
        text: &str,
    ) -> Result<ChatReply, OrchestratorError> {
        if text.trim().is_empty() {
            return Err(OrchestratorError::EmptyMessage);
        }

        let (session_id, issued) = SessionId::resolve(session_id);
        let ctx = TurnContext::new(session_id, expand_abbreviations(text), Utc::now());
        let dates = DateContext::at(ctx.received_at);
        let start = Instant::now();
        tracing::info!(session_id = %ctx.session_id, new_session = issued, "Message received");

        let mut state = TurnState::Start;
        let mut events = vec![Event::MessageReceived];

        // Process events in a loop - each effect yields at most one event
        while let Some(event) = events.pop() {
            let result = transition(&state, &ctx, event).map_err(|e| {
                tracing::error!(session_id = %ctx.session_id, state = state.name(), error = %e, "Turn aborted");
                OrchestratorError::Internal(e.to_string())
            })?;
            tracing::debug!(
                session_id = %ctx.session_id,
                from = state.name(),
                to = result.new_state.name(),
                "Turn transition"
            );
            state = result.new_state;

            for effect in result.effects {
                if let Some(next) = self.execute_effect(&ctx, &dates, effect).await {
                    events.push(next);
                }
            }
        }

        match state {
            TurnState::Done { reply, persisted } => {
                tracing::info!(
                    session_id = %ctx.session_id,
                    persisted,
                    duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Reply ready"
                );
                Ok(ChatReply {
                    reply,
                    session_id: ctx.session_id.to_string(),
                })
            }
            other => Err(OrchestratorError::Internal(format!(
                "turn stopped in {}",
                other.name()
            ))),
        }
    }

    async fn execute_effect(
        &self,
        ctx: &TurnContext,
        dates: &DateContext,
        effect: Effect,
    ) -> Option<Event> {
        match effect {
            Effect::LoadHistory => Some(match self.history.load(&ctx.session_id).await {
                Ok(turns) => Event::HistoryLoaded { turns },
                Err(e) => Event::HistoryUnavailable {
                    reason: e.to_string(),
                },
            }),

            Effect::SelectIntent { history } => {
                let intent = self.intents.select(&ctx.utterance, &history, dates).await;
                Some(Event::IntentSelected { intent })
            }

            Effect::ExecuteTool { invocation } => Some(match self.queries.dispatch(&invocation).await {
                Ok(result) => Event::ToolCompleted { result },
                Err(failure) => Event::ToolFailed { failure },
            }),

            Effect::Synthesize { history, grounding } => {
                let synthesis = self
                    .synthesizer
                    .synthesize(&ctx.utterance, &history, &grounding, dates)
                    .await;
                Some(if synthesis.fell_back {
                    Event::SynthesisFellBack {
                        reply: synthesis.reply,
                    }
                } else {
                    Event::ReplySynthesized {
                        reply: synthesis.reply,
                    }
                })
            }

            Effect::PersistTurn { reply } => {
                let answered_at = Utc::now().max(ctx.received_at + TimeDelta::milliseconds(1));
                let turns = [
                    Turn::user(ctx.utterance.clone(), ctx.received_at),
                    Turn::assistant(reply, answered_at),
                ];
                Some(match self.history.append_turns(&ctx.session_id, &turns).await {
                    Ok(()) => Event::TurnPersisted,
                    Err(e) => Event::PersistFailed {
                        reason: e.to_string(),
                    },
                })
            }

            Effect::LogDegradation { component, reason } => {
                tracing::warn!(
                    session_id = %ctx.session_id,
                    component = %component,
                    reason = %reason,
                    "Dependency degraded, continuing"
                );
                None
            }
        }
    }
}
