//! Redis-backed history
//!
//! Each session is a list under `chat_history:{session}` holding JSON turns.
//! Appends run as one MULTI/EXEC pipeline so the push, trim and TTL reset
//! land together.

use super::{strictly_increasing, HistoryError, HistoryStore, SessionId, Turn};
use crate::config::HistoryConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use std::future::Future;

const KEY_PREFIX: &str = "chat_history:";

pub struct RedisHistory {
    conn: ConnectionManager,
    config: HistoryConfig,
}

impl RedisHistory {
    pub async fn connect(url: &str, config: HistoryConfig) -> Result<Self, HistoryError> {
        let client =
            redis::Client::open(url).map_err(|e| HistoryError::StoreUnavailable(e.to_string()))?;
        let conn = bounded(&config, ConnectionManager::new(client)).await?;
        Ok(Self { conn, config })
    }
}

fn history_key(session: &SessionId) -> String {
    format!("{KEY_PREFIX}{session}")
}

/// LTRIM/LRANGE start index keeping the newest `max_turns`
fn window_start(max_turns: usize) -> isize {
    isize::try_from(max_turns).map_or(isize::MIN, |n| -n)
}

/// Decode stored entries, skipping any that are not valid turns
fn decode_turns(session: &SessionId, raw: &[String]) -> Vec<Turn> {
    raw.iter()
        .filter_map(|entry| match serde_json::from_str::<Turn>(entry) {
            Ok(turn) => Some(turn),
            Err(e) => {
                tracing::warn!(session_id = %session, error = %e, "Skipping undecodable history entry");
                None
            }
        })
        .collect()
}

/// Timestamp of the newest stored entry, if it decodes
fn newest_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|entry| serde_json::from_str::<Turn>(entry).ok())
        .map(|turn| turn.timestamp)
}

async fn bounded<T>(
    config: &HistoryConfig,
    op: impl Future<Output = RedisResult<T>>,
) -> Result<T, HistoryError> {
    match tokio::time::timeout(config.timeout, op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(HistoryError::StoreUnavailable(e.to_string())),
        Err(_) => Err(HistoryError::StoreUnavailable(format!(
            "timed out after {}ms",
            config.timeout.as_millis()
        ))),
    }
}

#[async_trait]
impl HistoryStore for RedisHistory {
    async fn load(&self, session: &SessionId) -> Result<Vec<Turn>, HistoryError> {
        let key = history_key(session);
        let mut conn = self.conn.clone();
        let raw: Vec<String> = bounded(
            &self.config,
            conn.lrange(&key, window_start(self.config.max_turns), -1),
        )
        .await?;
        Ok(decode_turns(session, &raw))
    }

    async fn append_turns(&self, session: &SessionId, turns: &[Turn]) -> Result<(), HistoryError> {
        if turns.is_empty() {
            return Ok(());
        }

        let key = history_key(session);
        let mut conn = self.conn.clone();
        let newest: Option<String> = bounded(&self.config, conn.lindex(&key, -1)).await?;

        let entries = strictly_increasing(newest_timestamp(newest.as_deref()), turns)
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        let ttl = i64::try_from(self.config.ttl.as_secs()).unwrap_or(i64::MAX);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .rpush(&key, entries)
            .ignore()
            .ltrim(&key, window_start(self.config.max_turns), -1)
            .ignore()
            .expire(&key, ttl)
            .ignore();

        bounded::<()>(&self.config, pipe.query_async(&mut conn)).await?;

        tracing::debug!(session_id = %session, appended = turns.len(), "History appended");
        Ok(())
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        let mut conn = self.conn.clone();
        bounded::<String>(&self.config, redis::cmd("PING").query_async(&mut conn)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_790_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_key_is_prefixed_session() {
        let session = SessionId::parse("6f9619ff-8b86-d011-b42d-00cf4fc964ff").unwrap();
        assert_eq!(
            history_key(&session),
            "chat_history:6f9619ff-8b86-d011-b42d-00cf4fc964ff"
        );
    }

    #[test]
    fn test_window_keeps_newest_turns() {
        assert_eq!(window_start(100), -100);
        assert_eq!(window_start(1), -1);
        assert_eq!(window_start(usize::MAX), isize::MIN);
    }

    #[test]
    fn test_undecodable_entries_are_skipped() {
        let session = SessionId::generate();
        let raw = vec![
            serde_json::to_string(&Turn::user("πρώτο", at(0))).unwrap(),
            "{\"role\":\"system\",\"text\":\"x\"}".to_string(),
            "not json".to_string(),
            serde_json::to_string(&Turn::assistant("δεύτερο", at(1))).unwrap(),
        ];

        let turns = decode_turns(&session, &raw);
        let texts: Vec<_> = turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["πρώτο", "δεύτερο"]);
    }

    #[test]
    fn test_newest_timestamp() {
        let stored = serde_json::to_string(&Turn::assistant("a", at(7))).unwrap();
        assert_eq!(newest_timestamp(Some(stored.as_str())), Some(at(7)));
        assert_eq!(newest_timestamp(Some("garbage")), None);
        assert_eq!(newest_timestamp(None), None);
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_store_fails() {
        let config = HistoryConfig {
            timeout: Duration::from_millis(300),
            ..HistoryConfig::default()
        };
        let result = RedisHistory::connect("redis://127.0.0.1:1/", config).await;
        assert!(matches!(result, Err(HistoryError::StoreUnavailable(_))));
    }
}
