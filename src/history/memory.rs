//! In-process history store
//!
//! Same contract as the Redis store. Used when no `REDIS_URL` is
//! configured and throughout the test suite.

use super::{strictly_increasing, HistoryError, HistoryStore, SessionId, Turn};
use crate::config::HistoryConfig;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

struct Entry {
    turns: VecDeque<Turn>,
    expires_at: Instant,
}

pub struct InMemoryHistory {
    sessions: Mutex<HashMap<SessionId, Entry>>,
    config: HistoryConfig,
}

impl InMemoryHistory {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn load(&self, session: &SessionId) -> Result<Vec<Turn>, HistoryError> {
        let now = Instant::now();
        let mut sessions = self.sessions();
        match sessions.get(session) {
            Some(entry) if entry.expires_at > now => Ok(entry.turns.iter().cloned().collect()),
            Some(_) => {
                sessions.remove(session);
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn append_turns(&self, session: &SessionId, turns: &[Turn]) -> Result<(), HistoryError> {
        let now = Instant::now();
        let mut sessions = self.sessions();
        sessions.retain(|_, entry| entry.expires_at > now);

        let entry = sessions.entry(session.clone()).or_insert_with(|| Entry {
            turns: VecDeque::new(),
            expires_at: now,
        });

        let last = entry.turns.back().map(|t| t.timestamp);
        entry.turns.extend(strictly_increasing(last, turns));
        while entry.turns.len() > self.config.max_turns {
            entry.turns.pop_front();
        }
        entry.expires_at = now + self.config.ttl;
        Ok(())
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        Ok(())
    }
}
