//! Per-message turn state machine
//!
//! Pure transitions in the Elm style: the orchestrator feeds events in and
//! executes the effects that come out. No I/O happens here.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Component, Effect};
pub use event::Event;
pub use state::{TurnContext, TurnState};
pub use transition::transition;
