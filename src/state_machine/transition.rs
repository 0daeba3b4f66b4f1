//! Pure state transition function

use super::{Component, Effect, Event, TurnContext, TurnState};
use crate::intent::Intent;
use crate::synthesizer::Grounding;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function: same inputs, same outputs, no I/O
pub fn transition(
    state: &TurnState,
    _context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (TurnState::Start, Event::MessageReceived) => {
            Ok(TransitionResult::new(TurnState::LoadingHistory).with_effect(Effect::LoadHistory))
        }

        // ============================================================
        // History
        // ============================================================
        (TurnState::LoadingHistory, Event::HistoryLoaded { turns }) => Ok(TransitionResult::new(
            TurnState::SelectingIntent {
                history: turns.clone(),
            },
        )
        .with_effect(Effect::SelectIntent { history: turns })),

        // Degrade to an empty history rather than failing the turn
        (TurnState::LoadingHistory, Event::HistoryUnavailable { reason }) => {
            Ok(TransitionResult::new(TurnState::SelectingIntent { history: vec![] })
                .with_effect(Effect::degraded(Component::HistoryLoad, reason))
                .with_effect(Effect::SelectIntent { history: vec![] }))
        }

        // ============================================================
        // Intent
        // ============================================================
        (TurnState::SelectingIntent { history }, Event::IntentSelected { intent }) => match intent {
            Intent::DirectAnswer(text) => Ok(TransitionResult::new(TurnState::Synthesizing)
                .with_effect(Effect::synthesize(history.clone(), Grounding::Direct(text)))),
            Intent::Clarify(text) => Ok(TransitionResult::new(TurnState::Synthesizing)
                .with_effect(Effect::synthesize(history.clone(), Grounding::Clarify(text)))),
            Intent::ToolCall(invocation) => Ok(TransitionResult::new(TurnState::ExecutingTool {
                history: history.clone(),
                invocation: invocation.clone(),
            })
            .with_effect(Effect::ExecuteTool { invocation })),
        },

        // ============================================================
        // Tool
        // ============================================================
        (TurnState::ExecutingTool { history, invocation }, Event::ToolCompleted { result })
            if result.tool == invocation.tool_name() =>
        {
            Ok(TransitionResult::new(TurnState::Synthesizing)
                .with_effect(Effect::synthesize(history.clone(), Grounding::Tool(result))))
        }

        (TurnState::ExecutingTool { history, invocation }, Event::ToolFailed { failure })
            if failure.tool == invocation.tool_name() =>
        {
            Ok(TransitionResult::new(TurnState::Synthesizing)
                .with_effect(Effect::degraded(
                    Component::Tool(failure.tool),
                    failure.reason.clone(),
                ))
                .with_effect(Effect::synthesize(history.clone(), Grounding::ToolFailed(failure))))
        }

        // ============================================================
        // Reply
        // ============================================================
        (TurnState::Synthesizing, Event::ReplySynthesized { reply }) => Ok(TransitionResult::new(
            TurnState::Persisting {
                reply: reply.clone(),
            },
        )
        .with_effect(Effect::PersistTurn { reply })),

        // A fallback reply is returned but never written to history
        (TurnState::Synthesizing, Event::SynthesisFellBack { reply }) => {
            Ok(TransitionResult::new(TurnState::Done {
                reply,
                persisted: false,
            }))
        }

        (TurnState::Persisting { reply }, Event::TurnPersisted) => {
            Ok(TransitionResult::new(TurnState::Done {
                reply: reply.clone(),
                persisted: true,
            }))
        }

        (TurnState::Persisting { reply }, Event::PersistFailed { reason }) => {
            Ok(TransitionResult::new(TurnState::Done {
                reply: reply.clone(),
                persisted: false,
            })
            .with_effect(Effect::degraded(Component::HistoryPersist, reason)))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} on {event:?}",
            state.name()
        ))),
    }
}
