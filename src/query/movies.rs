//! Cinema screenings

use super::filters::{finish, Conditions, Match};
use super::{by_date, date_heading, fetch, mismatch, QueryExecutor, Records, ToolFailed, ToolResult};
use crate::catalog::{MoviesParams, ToolInvocation, ToolName};
use crate::config::QueryConfig;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::fmt::Write;

const JOINS: &str = " FROM screenings s \
     JOIN movies m ON m.id = s.movie_id \
     JOIN halls h ON h.id = s.hall_id \
     JOIN cinemas c ON c.id = h.cinema_id";

/// Screening row; `screening_time` and `hall_name` are NULL in summary mode
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ScreeningRow {
    pub screening_date: NaiveDate,
    pub screening_time: Option<NaiveTime>,
    pub movie_name: String,
    pub cinema_name: String,
    pub hall_name: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
}

pub(crate) fn statement(params: &MoviesParams, config: &QueryConfig) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(if params.halls_and_screening_times {
        "SELECT s.screening_date, s.screening_time, m.movie_name, c.cinema_name, \
         h.hall_name, m.genre, m.year"
    } else {
        "SELECT DISTINCT s.screening_date, NULL::time AS screening_time, m.movie_name, \
         c.cinema_name, NULL::text AS hall_name, m.genre, m.year"
    });
    qb.push(JOINS);
    {
        let mut c = Conditions::new(&mut qb, config.fuzzy_threshold);
        c.dates("s.screening_date", &params.dates);
        c.text(
            &[
                "m.normalized_movie_name",
                "m.normalized_movie_name_greek",
                "m.normalized_movie_name_english",
            ],
            &params.movies,
            Match::Fuzzy,
        );
        c.text(&["c.cinema_name"], &params.cinemas, Match::FuzzyOrContains);
        c.text(&["m.normalized_genre"], &params.genres, Match::FuzzyOrRegex);
        c.equals("m.year", params.year);
    }
    // DISTINCT rows are unique on (date, cinema, movie), both names being unique keys
    let order_by = if params.halls_and_screening_times {
        "s.screening_date, c.cinema_name, m.movie_name, s.screening_time, s.id"
    } else {
        "s.screening_date, c.cinema_name, m.movie_name"
    };
    finish(&mut qb, order_by, config.result_limit);
    qb
}

pub(crate) fn render(rows: &[ScreeningRow], detailed: bool) -> String {
    if rows.is_empty() {
        return "No movie screenings match the criteria.".to_string();
    }
    let mut out = String::from("Movie screenings:");
    for (date, day) in by_date(rows, |r| Some(r.screening_date)) {
        out.push_str(&date_heading(date));

        let mut cinemas: BTreeMap<&str, BTreeMap<&str, Vec<&ScreeningRow>>> = BTreeMap::new();
        for r in day {
            cinemas
                .entry(r.cinema_name.as_str())
                .or_default()
                .entry(r.movie_name.as_str())
                .or_default()
                .push(r);
        }

        for (cinema, movies) in cinemas {
            let _ = write!(out, "\n  Cinema: {cinema}");
            for (movie, mut showings) in movies {
                let _ = write!(out, "\n    - {movie}");
                if let Some(details) = describe(showings.first().copied()) {
                    let _ = write!(out, " ({details})");
                }
                if detailed {
                    showings.sort_by_key(|r| r.screening_time);
                    let times: Vec<String> = showings
                        .iter()
                        .map(|r| {
                            format!(
                                "{} ({})",
                                r.screening_time
                                    .map_or_else(|| "unknown time".to_string(), |t| t.format("%H:%M").to_string()),
                                r.hall_name.as_deref().unwrap_or("unknown hall")
                            )
                        })
                        .collect();
                    let _ = write!(out, ": {}", times.join(", "));
                }
            }
        }
    }
    out
}

fn describe(row: Option<&ScreeningRow>) -> Option<String> {
    let row = row?;
    let parts: Vec<String> = [
        row.genre.clone(),
        row.year.map(|y| y.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

pub struct MoviesExecutor {
    pool: PgPool,
    config: QueryConfig,
}

impl MoviesExecutor {
    pub fn new(pool: PgPool, config: QueryConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl QueryExecutor for MoviesExecutor {
    fn tool(&self) -> ToolName {
        ToolName::Movies
    }

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolFailed> {
        let ToolInvocation::Movies(params) = invocation else {
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
            Records::Screenings {
                detailed: params.halls_and_screening_times,
                rows,
            },
            self.config.result_limit,
        ))
    }
}
