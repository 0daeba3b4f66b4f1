//! Effects produced by state transitions

use crate::catalog::{ToolInvocation, ToolName};
use crate::history::Turn;
use crate::synthesizer::Grounding;
use std::fmt;

/// Dependency that failed without failing the turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    HistoryLoad,
    HistoryPersist,
    Tool(ToolName),
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::HistoryLoad => f.write_str("history_load"),
            Component::HistoryPersist => f.write_str("history_persist"),
            Component::Tool(tool) => write!(f, "tool:{tool}"),
        }
    }
}

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Read the session's turns
    LoadHistory,

    /// Ask the intent selector what to do
    SelectIntent { history: Vec<Turn> },

    /// Run the chosen tool
    ExecuteTool { invocation: ToolInvocation },

    /// Produce the user-facing reply
    Synthesize {
        history: Vec<Turn>,
        grounding: Grounding,
    },

    /// Append the user turn and `reply` in one store operation
    PersistTurn { reply: String },

    /// Record a degraded dependency
    LogDegradation { component: Component, reason: String },
}

impl Effect {
    pub fn degraded(component: Component, reason: impl Into<String>) -> Self {
        Effect::LogDegradation {
            component,
            reason: reason.into(),
        }
    }

    pub fn synthesize(history: Vec<Turn>, grounding: Grounding) -> Self {
        Effect::Synthesize { history, grounding }
    }
}
