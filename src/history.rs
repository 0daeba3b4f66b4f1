//! Conversation history
//!
//! A bounded, ordered turn log per session, kept in an expiring store.
//! The agent itself holds no session state between requests.

mod memory;
mod redis_store;

pub use memory::InMemoryHistory;
pub use redis_store::RedisHistory;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message unit in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp,
        }
    }

    pub fn assistant(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp,
        }
    }
}

/// Opaque session token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Issue a fresh token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a caller-supplied token if it is a well-formed UUID
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim())
            .ok()
            .map(|id| Self(id.to_string()))
    }

    /// Reuse a valid token or issue a new one; the flag is true when issued
    pub fn resolve(raw: Option<&str>) -> (Self, bool) {
        match raw.and_then(Self::parse) {
            Some(id) => (id, false),
            None => (Self::generate(), true),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("failed to encode turn: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Copy `turns`, bumping timestamps so each is strictly later than the
/// one before it, starting after `last`
pub(crate) fn strictly_increasing(last: Option<DateTime<Utc>>, turns: &[Turn]) -> Vec<Turn> {
    let mut previous = last;
    turns
        .iter()
        .map(|turn| {
            let mut turn = turn.clone();
            if let Some(prev) = previous {
                if turn.timestamp <= prev {
                    turn.timestamp = prev + TimeDelta::microseconds(1);
                }
            }
            previous = Some(turn.timestamp);
            turn
        })
        .collect()
}

/// Expiring, bounded turn log keyed by session
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Ordered turns, oldest first; empty if unknown or expired
    async fn load(&self, session: &SessionId) -> Result<Vec<Turn>, HistoryError>;

    /// Append turns as one store operation, reset the TTL, keep the last N.
    /// Timestamps not later than the newest stored turn are moved forward.
    async fn append_turns(&self, session: &SessionId, turns: &[Turn]) -> Result<(), HistoryError>;

    /// Append a single turn
    async fn append(&self, session: &SessionId, turn: Turn) -> Result<(), HistoryError> {
        self.append_turns(session, std::slice::from_ref(&turn)).await
    }

    /// Reachability probe
    async fn ping(&self) -> Result<(), HistoryError>;
}
