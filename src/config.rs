//! Service configuration from the environment

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// History store limits
#[derive(Debug, Clone, Copy)]
pub struct HistoryConfig {
    /// Inactivity TTL after which a session is evicted
    pub ttl: Duration,
    /// Maximum stored turns per session
    pub max_turns: usize,
    /// Turns included in prompts
    pub context_turns: usize,
    pub timeout: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(86_400),
            max_turns: 100,
            context_turns: 4,
            timeout: Duration::from_millis(2_000),
        }
    }
}

/// Query building and execution limits
#[derive(Debug, Clone, Copy)]
pub struct QueryConfig {
    pub fuzzy_threshold: f32,
    pub similarity_threshold: f64,
    /// Maximum records returned by any tool
    pub result_limit: usize,
    pub db_timeout: Duration,
    pub embedding_timeout: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.1,
            similarity_threshold: 0.3,
            result_limit: 20,
            db_timeout: Duration::from_secs(10),
            embedding_timeout: Duration::from_secs(10),
        }
    }
}

/// Model call policy shared by intent selection and synthesis
#[derive(Debug, Clone, Copy)]
pub struct ModelPolicy {
    pub timeout: Duration,
    /// Attempts for retryable model errors
    pub max_attempts: u32,
    /// First backoff delay, doubled per attempt
    pub retry_base: Duration,
}

impl Default for ModelPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_base: Duration::from_millis(1_000),
        }
    }
}

/// Upper bound for a single backoff delay
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

impl ModelPolicy {
    /// Exponential backoff: base, 2*base, 4*base, capped at one minute
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base
            .checked_mul(1 << attempt.saturating_sub(1).min(6))
            .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub port: u16,
    pub db_pool_size: u32,
    pub health_timeout: Duration,
    pub embedding_model: String,
    pub history: HistoryConfig,
    pub query: QueryConfig,
    pub model: ModelPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let history = HistoryConfig {
            ttl: Duration::from_secs(parse_or("HISTORY_TTL_SECS", 86_400)?),
            max_turns: parse_or("HISTORY_MAX_TURNS", 100)?,
            context_turns: parse_or("HISTORY_CONTEXT_TURNS", 4)?,
            timeout: Duration::from_millis(parse_or("CACHE_TIMEOUT_MS", 2_000)?),
        };
        if history.max_turns == 0 {
            return Err(ConfigError::Invalid {
                name: "HISTORY_MAX_TURNS",
                value: "0".to_string(),
            });
        }

        let query = QueryConfig {
            fuzzy_threshold: parse_or("FUZZY_THRESHOLD", 0.1)?,
            similarity_threshold: parse_or("SIMILARITY_THRESHOLD", 0.3)?,
            result_limit: parse_or("RESULT_LIMIT", 20)?,
            db_timeout: Duration::from_secs(parse_or("DB_TIMEOUT_SECS", 10)?),
            embedding_timeout: Duration::from_secs(parse_or("EMBEDDING_TIMEOUT_SECS", 10)?),
        };

        let model = ModelPolicy {
            timeout: Duration::from_secs(parse_or("LLM_TIMEOUT_SECS", 30)?),
            max_attempts: parse_or("LLM_MAX_ATTEMPTS", 3)?,
            retry_base: Duration::from_millis(parse_or("RETRY_BASE_MS", 1_000)?),
        };

        Ok(Self {
            database_url,
            redis_url: std::env::var("REDIS_URL").ok().filter(|u| !u.is_empty()),
            port: parse_or("PORT", 8000)?,
            db_pool_size: parse_or("DB_POOL_SIZE", 5)?,
            health_timeout: Duration::from_millis(parse_or("HEALTH_CHECK_TIMEOUT_MS", 1_000)?),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            history,
            query,
            model,
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        _ => Ok(default),
    }
}
