//! Runtime for handling chat messages
//!
//! The orchestrator drives the pure turn state machine and performs its
//! effects against the history store, the model and the query executors.

mod orchestrator;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use orchestrator::{Orchestrator, OrchestratorError};
pub use traits::*;
