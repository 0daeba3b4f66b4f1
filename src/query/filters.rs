//! WHERE clause assembly shared by the relational tools
//!
//! Distinct filters are AND-ed. Terms inside one filter are OR-ed. Every
//! value goes through a bind parameter, so identical parameters always
//! yield identical SQL text and bind order.

use crate::catalog::DateFilter;
use crate::text::normalize_text;
use sqlx::{Encode, Postgres, QueryBuilder, Type};

/// How free-text terms are compared with a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Match {
    /// `similarity(col, term) > threshold` on normalized terms
    Fuzzy,
    /// Fuzzy, plus a word-boundary regex on normalized terms
    FuzzyOrRegex,
    /// Fuzzy or `ILIKE %term%` on the raw term, for unnormalized columns
    FuzzyOrContains,
}

pub(crate) struct Conditions<'q> {
    qb: &'q mut QueryBuilder<'static, Postgres>,
    fuzzy_threshold: f32,
    started: bool,
}

impl<'q> Conditions<'q> {
    pub(crate) fn new(qb: &'q mut QueryBuilder<'static, Postgres>, fuzzy_threshold: f32) -> Self {
        Self {
            qb,
            fuzzy_threshold,
            started: false,
        }
    }

    fn open(&mut self) -> &mut QueryBuilder<'static, Postgres> {
        self.qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
        self.qb
    }

    pub(crate) fn dates(&mut self, column: &str, filter: &DateFilter) {
        if let DateFilter::On(dates) = filter {
            self.open()
                .push(column)
                .push(" = ANY(")
                .push_bind(dates.clone())
                .push(")");
        }
    }

    pub(crate) fn equals<T>(&mut self, column: &str, value: Option<T>)
    where
        T: 'static + Encode<'static, Postgres> + Type<Postgres>,
    {
        if let Some(value) = value {
            self.open().push(column).push(" = ").push_bind(value);
        }
    }

    pub(crate) fn at_least(&mut self, column: &str, value: Option<String>) {
        if let Some(value) = value {
            self.open().push(column).push(" >= ").push_bind(value);
        }
    }

    pub(crate) fn at_most(&mut self, column: &str, value: Option<String>) {
        if let Some(value) = value {
            self.open().push(column).push(" <= ").push_bind(value);
        }
    }

    /// Match any of `terms` against any of `columns`
    pub(crate) fn text(&mut self, columns: &[&str], terms: &[String], mode: Match) {
        let terms: Vec<String> = terms
            .iter()
            .map(|t| match mode {
                Match::FuzzyOrContains => t.trim().to_string(),
                Match::Fuzzy | Match::FuzzyOrRegex => normalize_text(t),
            })
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() || columns.is_empty() {
            return;
        }

        let threshold = self.fuzzy_threshold;
        let qb = self.open();
        qb.push("(");
        let mut first = true;

        for term in &terms {
            for column in columns {
                separate(qb, &mut first);
                qb.push("similarity(")
                    .push(*column)
                    .push(", ")
                    .push_bind(term.clone())
                    .push(") > ")
                    .push_bind(threshold);
            }
            match mode {
                Match::Fuzzy => {}
                Match::FuzzyOrRegex => {
                    let pattern = word_pattern(term);
                    for column in columns {
                        separate(qb, &mut first);
                        qb.push(*column).push(" ~* ").push_bind(pattern.clone());
                    }
                }
                Match::FuzzyOrContains => {
                    let pattern = format!("%{}%", escape_like(term));
                    for column in columns {
                        separate(qb, &mut first);
                        qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
                    }
                }
            }
        }
        qb.push(")");
    }
}

fn separate(qb: &mut QueryBuilder<'static, Postgres>, first: &mut bool) {
    if !*first {
        qb.push(" OR ");
    }
    *first = false;
}

/// Postgres ARE matching every word of `term` in order, on word boundaries
pub(crate) fn word_pattern(term: &str) -> String {
    term.split_whitespace()
        .map(|w| format!(r"\m{}\M", regex::escape(w)))
        .collect::<Vec<_>>()
        .join(".*")
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Terminate a statement with its ordering and the result cap
pub(crate) fn finish(qb: &mut QueryBuilder<'static, Postgres>, order_by: &str, limit: usize) {
    qb.push(" ORDER BY ")
        .push(order_by)
        .push(" LIMIT ")
        .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
}
