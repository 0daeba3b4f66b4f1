//! Structured-data tools
//!
//! One executor per catalogued tool, all behind the same `QueryExecutor`
//! signature. The registry is the only dispatch point: a tool without an
//! executor, or an invocation handed to the wrong executor, is a
//! `ToolFailed` like any data-access error.

mod filters;
mod history;
mod hospital_shifts;
mod movies;
mod outages;
mod performances;

pub use history::{HistoryExecutor, Passage};
pub use hospital_shifts::{HospitalShiftRow, HospitalShiftsExecutor};
pub use movies::{MoviesExecutor, ScreeningRow};
pub use outages::{OutageRow, OutagesExecutor};
pub use performances::{PerformanceRow, PerformancesExecutor};

use crate::catalog::{ToolInvocation, ToolName};
use crate::config::QueryConfig;
use crate::llm::EmbeddingService;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// A tool call that produced no usable data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{tool} failed: {reason}")]
pub struct ToolFailed {
    pub tool: ToolName,
    pub reason: String,
}

impl ToolFailed {
    pub fn new(tool: ToolName, reason: impl Into<String>) -> Self {
        Self {
            tool,
            reason: reason.into(),
        }
    }
}

/// Rows returned by a tool, in query order
#[derive(Debug, Clone, PartialEq)]
pub enum Records {
    Outages(Vec<OutageRow>),
    Performances(Vec<PerformanceRow>),
    Screenings {
        /// Rows carry hall and time, otherwise one row per date/cinema/movie
        detailed: bool,
        rows: Vec<ScreeningRow>,
    },
    HospitalShifts(Vec<HospitalShiftRow>),
    History(Vec<Passage>),
}

impl Records {
    pub fn len(&self) -> usize {
        match self {
            Records::Outages(rows) => rows.len(),
            Records::Performances(rows) => rows.len(),
            Records::Screenings { rows, .. } => rows.len(),
            Records::HospitalShifts(rows) => rows.len(),
            Records::History(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn truncate(&mut self, limit: usize) {
        match self {
            Records::Outages(rows) => rows.truncate(limit),
            Records::Performances(rows) => rows.truncate(limit),
            Records::Screenings { rows, .. } => rows.truncate(limit),
            Records::HospitalShifts(rows) => rows.truncate(limit),
            Records::History(rows) => rows.truncate(limit),
        }
    }
}

/// Output of one executed tool, at most `limit` records
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool: ToolName,
    pub records: Records,
}

impl ToolResult {
    pub fn new(tool: ToolName, mut records: Records, limit: usize) -> Self {
        records.truncate(limit);
        Self { tool, records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Plain-text rendering handed to the synthesizer
    pub fn render(&self) -> String {
        match &self.records {
            Records::Outages(rows) => outages::render(rows),
            Records::Performances(rows) => performances::render(rows),
            Records::Screenings { detailed, rows } => movies::render(rows, *detailed),
            Records::HospitalShifts(rows) => hospital_shifts::render(rows),
            Records::History(rows) => history::render(rows),
        }
    }
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    fn tool(&self) -> ToolName;

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolFailed>;
}

/// Executors keyed by the tool they serve
#[derive(Default, Clone)]
pub struct QueryRegistry {
    executors: HashMap<ToolName, Arc<dyn QueryExecutor>>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All five Postgres-backed executors. History search is registered
    /// only when an embedding service is available.
    pub fn postgres(
        pool: &PgPool,
        embeddings: Option<Arc<dyn EmbeddingService>>,
        config: QueryConfig,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(OutagesExecutor::new(pool.clone(), config)));
        registry.register(Arc::new(PerformancesExecutor::new(pool.clone(), config)));
        registry.register(Arc::new(MoviesExecutor::new(pool.clone(), config)));
        registry.register(Arc::new(HospitalShiftsExecutor::new(pool.clone(), config)));
        match embeddings {
            Some(embeddings) => {
                registry.register(Arc::new(HistoryExecutor::new(pool.clone(), embeddings, config)));
            }
            None => tracing::warn!("No embedding service configured, history search disabled"),
        }
        registry
    }

    pub fn register(&mut self, executor: Arc<dyn QueryExecutor>) {
        self.executors.insert(executor.tool(), executor);
    }

    pub fn tools(&self) -> Vec<ToolName> {
        let mut tools: Vec<_> = self.executors.keys().copied().collect();
        tools.sort_by_key(|t| t.as_str());
        tools
    }

    pub async fn dispatch(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolFailed> {
        let tool = invocation.tool_name();
        let executor = self
            .executors
            .get(&tool)
            .ok_or_else(|| ToolFailed::new(tool, "no executor registered"))?;

        let start = Instant::now();
        let result = executor.execute(invocation).await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(r) => tracing::info!(
                tool = %tool,
                duration_ms,
                records = r.records.len(),
                "Tool executed"
            ),
            Err(e) => tracing::warn!(tool = %tool, duration_ms, reason = %e.reason, "Tool failed"),
        }
        result
    }
}

/// Run a built statement against the pool, bounded by `timeout`
async fn fetch<T>(
    pool: &PgPool,
    timeout: Duration,
    tool: ToolName,
    mut qb: QueryBuilder<'static, Postgres>,
) -> Result<Vec<T>, ToolFailed>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    tracing::debug!(tool = %tool, sql = qb.sql(), "Running query");
    let query = qb.build_query_as::<T>();
    match tokio::time::timeout(timeout, query.fetch_all(pool)).await {
        Ok(Ok(rows)) => Ok(rows),
        Ok(Err(e)) => Err(ToolFailed::new(tool, e.to_string())),
        Err(_) => Err(ToolFailed::new(
            tool,
            format!("query timed out after {}s", timeout.as_secs()),
        )),
    }
}

fn mismatch(expected: ToolName, got: &ToolInvocation) -> ToolFailed {
    ToolFailed::new(
        expected,
        format!("received a {} invocation", got.tool_name()),
    )
}

/// Group rows by date, chronologically; undated rows sort first
fn by_date<T>(rows: &[T], date: impl Fn(&T) -> Option<NaiveDate>) -> BTreeMap<Option<NaiveDate>, Vec<&T>> {
    let mut groups: BTreeMap<Option<NaiveDate>, Vec<&T>> = BTreeMap::new();
    for row in rows {
        groups.entry(date(row)).or_default().push(row);
    }
    groups
}

fn date_heading(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!("\n--- {} ---", d.format("%d/%m/%Y")),
        None => "\n--- unknown date ---".to_string(),
    }
}

fn or_unknown(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::params::HistoryParams;
    use crate::catalog::OutagesParams;
    use crate::runtime::testing::MockQueryExecutor;

    fn outage(id: i32) -> OutageRow {
        OutageRow {
            id,
            outage_date: NaiveDate::from_ymd_opt(2026, 10, 19),
            outage_type: Some("power".to_string()),
            outage_location: None,
            outage_affected_areas: None,
            outage_start: None,
            outage_end: None,
        }
    }

    #[test]
    fn test_result_is_capped() {
        let rows = (0..30).map(outage).collect();
        let result = ToolResult::new(ToolName::Outages, Records::Outages(rows), 20);
        assert_eq!(result.records.len(), 20);
    }

    #[test]
    fn test_by_date_is_chronological() {
        let days = [21, 19, 20, 19];
        let rows: Vec<NaiveDate> = days
            .iter()
            .map(|d| NaiveDate::from_ymd_opt(2026, 10, *d).unwrap())
            .collect();
        let groups = by_date(&rows, |d| Some(*d));
        let keys: Vec<u32> = groups.keys().map(|k| chrono::Datelike::day(&k.unwrap())).collect();
        assert_eq!(keys, vec![19, 20, 21]);
        assert_eq!(groups.values().next().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_without_executor_fails() {
        let registry = QueryRegistry::new();
        let err = registry
            .dispatch(&ToolInvocation::History(HistoryParams {
                search_query: "Ροτόντα".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.tool, ToolName::History);
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_tool() {
        let outages = Arc::new(MockQueryExecutor::returning(ToolResult::new(
            ToolName::Outages,
            Records::Outages(vec![outage(1)]),
            20,
        )));
        let mut registry = QueryRegistry::new();
        registry.register(outages.clone());
        assert_eq!(registry.tools(), vec![ToolName::Outages]);

        let invocation = ToolInvocation::Outages(OutagesParams::default());
        let result = registry.dispatch(&invocation).await.unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(outages.invocations(), vec![invocation]);
    }
}
