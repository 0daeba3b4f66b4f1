//! Scheduled power and water outages

use super::filters::{finish, Conditions, Match};
use super::{by_date, date_heading, fetch, mismatch, or_unknown, QueryExecutor, Records, ToolFailed, ToolResult};
use crate::catalog::{OutagesParams, ToolInvocation, ToolName};
use crate::config::QueryConfig;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OutageRow {
    pub id: i32,
    pub outage_date: Option<NaiveDate>,
    pub outage_type: Option<String>,
    pub outage_location: Option<String>,
    pub outage_affected_areas: Option<String>,
    pub outage_start: Option<NaiveTime>,
    pub outage_end: Option<NaiveTime>,
}

pub(crate) fn statement(params: &OutagesParams, config: &QueryConfig) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT id, outage_date, outage_type, outage_location, outage_affected_areas, \
         outage_start, outage_end FROM outages",
    );
    {
        let mut c = Conditions::new(&mut qb, config.fuzzy_threshold);
        c.dates("outage_date", &params.dates);
        c.equals("outage_type", params.outage_type.map(|t| t.as_str().to_string()));
        c.text(&["normalized_outage_location"], &params.locations, Match::FuzzyOrRegex);
        c.text(
            &["normalized_outage_affected_areas"],
            &params.affected_areas,
            Match::FuzzyOrRegex,
        );
    }
    finish(
        &mut qb,
        "outage_date DESC, outage_start DESC, id",
        config.result_limit,
    );
    qb
}

pub(crate) fn render(rows: &[OutageRow]) -> String {
    if rows.is_empty() {
        return "No scheduled outages match the criteria.".to_string();
    }
    let mut out = String::from("Scheduled outages:");
    for (date, mut day) in by_date(rows, |r| r.outage_date) {
        out.push_str(&date_heading(date));
        day.sort_by_key(|r| (r.outage_start.is_none(), r.outage_start, r.id));
        for r in day {
            let _ = write!(out, "\n- Type: {}", or_unknown(r.outage_type.as_deref()));
            if let Some(location) = &r.outage_location {
                let _ = write!(out, ", Location: {location}");
            }
            if let Some(areas) = &r.outage_affected_areas {
                let areas: Vec<&str> = areas.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
                let _ = write!(out, ", Areas: {}", areas.join(", "));
            }
            let _ = write!(out, ", Hours: {} - {}", hhmm(r.outage_start), hhmm(r.outage_end));
        }
    }
    out
}

pub(super) fn hhmm(time: Option<NaiveTime>) -> String {
    time.map_or_else(|| "unknown".to_string(), |t| t.format("%H:%M").to_string())
}

pub struct OutagesExecutor {
    pool: PgPool,
    config: QueryConfig,
}

impl OutagesExecutor {
    pub fn new(pool: PgPool, config: QueryConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl QueryExecutor for OutagesExecutor {
    fn tool(&self) -> ToolName {
        ToolName::Outages
    }

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolFailed> {
        let ToolInvocation::Outages(params) = invocation else {
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
            Records::Outages(rows),
            self.config.result_limit,
        ))
    }
}
