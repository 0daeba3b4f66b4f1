//! Concerts and theatrical plays

use super::filters::{finish, Conditions, Match};
use super::outages::hhmm;
use super::{by_date, date_heading, fetch, mismatch, or_unknown, QueryExecutor, Records, ToolFailed, ToolResult};
use crate::catalog::{PerformancesParams, ToolInvocation, ToolName};
use crate::config::QueryConfig;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PerformanceRow {
    pub id: i32,
    pub performance_date: Option<NaiveDate>,
    pub performance_name: Option<String>,
    pub performance_location: Option<String>,
    pub performance_type: Option<String>,
    pub performance_start_time: Option<NaiveTime>,
}

pub(crate) fn statement(
    params: &PerformancesParams,
    config: &QueryConfig,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT id, performance_date, performance_name, performance_location, \
         performance_type, performance_start_time FROM performances",
    );
    {
        let mut c = Conditions::new(&mut qb, config.fuzzy_threshold);
        c.dates("performance_date", &params.dates);
        c.text(&["normalized_performance_name"], &params.names, Match::Fuzzy);
        c.text(
            &["normalized_performance_location"],
            &params.locations,
            Match::Fuzzy,
        );
        c.equals(
            "performance_type",
            params.performance_type.map(|t| t.as_str().to_string()),
        );
    }
    finish(
        &mut qb,
        "performance_date, performance_name, id",
        config.result_limit,
    );
    qb
}

pub(crate) fn render(rows: &[PerformanceRow]) -> String {
    if rows.is_empty() {
        return "No performances match the criteria.".to_string();
    }
    let mut out = String::from("Performances:");
    for (date, mut day) in by_date(rows, |r| r.performance_date) {
        out.push_str(&date_heading(date));
        day.sort_by(|a, b| {
            (a.performance_start_time.is_none(), a.performance_start_time, &a.performance_name)
                .cmp(&(b.performance_start_time.is_none(), b.performance_start_time, &b.performance_name))
        });
        for r in day {
            let _ = write!(
                out,
                "\n- Performance: {}",
                or_unknown(r.performance_name.as_deref())
            );
            if let Some(location) = &r.performance_location {
                let _ = write!(out, ", Venue: {location}");
            }
            if let Some(kind) = &r.performance_type {
                let _ = write!(out, ", Type: {kind}");
            }
            let _ = write!(out, ", Starts: {}", hhmm(r.performance_start_time));
        }
    }
    out
}

pub struct PerformancesExecutor {
    pool: PgPool,
    config: QueryConfig,
}

impl PerformancesExecutor {
    pub fn new(pool: PgPool, config: QueryConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl QueryExecutor for PerformancesExecutor {
    fn tool(&self) -> ToolName {
        ToolName::Performances
    }

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolFailed> {
        let ToolInvocation::Performances(params) = invocation else {
            return Err(mismatch(self.tool(), invocation));
        };
        let rows = fetch(
            &self.pool,
            self.config.db_timeout,
            self.tool(),
            statement(params, &self.config),
        )
        .await?;
        Ok(ToolResult::new(
            self.tool(),
            Records::Performances(rows),
            self.config.result_limit,
        ))
    }
}
