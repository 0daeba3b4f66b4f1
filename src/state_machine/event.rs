//! Events that drive a turn forward

use crate::history::Turn;
use crate::intent::Intent;
use crate::query::{ToolFailed, ToolResult};

/// Outcome of the previous effect, fed back into `transition`
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MessageReceived,

    HistoryLoaded { turns: Vec<Turn> },
    HistoryUnavailable { reason: String },

    IntentSelected { intent: Intent },

    ToolCompleted { result: ToolResult },
    ToolFailed { failure: ToolFailed },

    ReplySynthesized { reply: String },
    /// The synthesizer returned its fixed apology
    SynthesisFellBack { reply: String },

    TurnPersisted,
    PersistFailed { reason: String },
}
