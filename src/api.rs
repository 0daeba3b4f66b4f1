//! HTTP API
//!
//! A thin transport over the orchestrator: one chat endpoint, a health
//! probe and a little service metadata.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::db::Database;
use crate::history::HistoryStore;
use crate::llm::ModelRegistry;
use crate::runtime::Orchestrator;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub database: Database,
    pub history: Arc<dyn HistoryStore>,
    pub llm_registry: Arc<ModelRegistry>,
    /// Bound on each health probe
    pub health_timeout: Duration,
}
