//! Turn state types

use crate::catalog::ToolInvocation;
use crate::history::{SessionId, Turn};
use chrono::{DateTime, Utc};

/// Where a single message is in its handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    /// Message accepted, nothing done yet
    Start,

    /// Waiting for the session history
    LoadingHistory,

    /// Waiting for the intent selector
    SelectingIntent { history: Vec<Turn> },

    /// Waiting for the single tool of this turn
    ExecutingTool {
        history: Vec<Turn>,
        invocation: ToolInvocation,
    },

    /// Waiting for the reply
    Synthesizing,

    /// Waiting for the exchange to be written back
    Persisting { reply: String },

    /// Terminal: the reply is ready for the caller
    Done { reply: String, persisted: bool },
}

impl TurnState {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            TurnState::Start => "start",
            TurnState::LoadingHistory => "loading_history",
            TurnState::SelectingIntent { .. } => "selecting_intent",
            TurnState::ExecutingTool { .. } => "executing_tool",
            TurnState::Synthesizing => "synthesizing",
            TurnState::Persisting { .. } => "persisting",
            TurnState::Done { .. } => "done",
        }
    }
}

/// Immutable facts about the message being handled
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub session_id: SessionId,
    /// The user's text with chat abbreviations expanded
    pub utterance: String,
    pub received_at: DateTime<Utc>,
}

impl TurnContext {
    pub fn new(session_id: SessionId, utterance: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            utterance: utterance.into(),
            received_at,
        }
    }
}
