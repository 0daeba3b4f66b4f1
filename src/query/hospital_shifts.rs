//! On-duty hospital shifts
//!
//! Shift times are stored as `HH:MM:SS` text, so the time bounds compare
//! lexically against values in that same format.

use super::filters::{finish, Conditions, Match};
use super::{by_date, date_heading, fetch, mismatch, or_unknown, QueryExecutor, Records, ToolFailed, ToolResult};
use crate::catalog::{HospitalShiftsParams, ToolInvocation, ToolName};
use crate::config::QueryConfig;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct HospitalShiftRow {
    pub id: i32,
    pub hospital_shift_date: Option<NaiveDate>,
    pub hospital_name: Option<String>,
    pub specialties: Option<String>,
    pub hospital_shift_start_time: Option<String>,
    pub hospital_shift_end_time: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
}

fn as_stored(time: Option<NaiveTime>) -> Option<String> {
    time.map(|t| t.format("%H:%M:%S").to_string())
}

pub(crate) fn statement(
    params: &HospitalShiftsParams,
    config: &QueryConfig,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT id, hospital_shift_date, hospital_name, specialties, \
         hospital_shift_start_time, hospital_shift_end_time, ",
    );
    qb.push(if params.include_contact_info {
        "address, phone_number"
    } else {
        "NULL::text AS address, NULL::text AS phone_number"
    });
    qb.push(" FROM hospital_shifts");
    {
        let mut c = Conditions::new(&mut qb, config.fuzzy_threshold);
        c.dates("hospital_shift_date", &params.dates);
        c.text(
            &["normalized_hospital_name"],
            &params.hospital_names,
            Match::FuzzyOrRegex,
        );
        c.at_least("hospital_shift_start_time", as_stored(params.start_time));
        c.at_most("hospital_shift_end_time", as_stored(params.end_time));
    }
    finish(
        &mut qb,
        "hospital_shift_date, hospital_name, id",
        config.result_limit,
    );
    qb
}

fn short_time(raw: Option<&str>) -> &str {
    match raw.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.get(..5).unwrap_or(t),
        None => "unknown",
    }
}

pub(crate) fn render(rows: &[HospitalShiftRow]) -> String {
    if rows.is_empty() {
        return "No on-duty hospital shifts match the criteria.".to_string();
    }
    let mut out = String::from("On-duty hospital shifts:");
    for (date, mut day) in by_date(rows, |r| r.hospital_shift_date) {
        out.push_str(&date_heading(date));
        day.sort_by(|a, b| a.hospital_name.cmp(&b.hospital_name).then(a.id.cmp(&b.id)));
        for r in day {
            let _ = write!(
                out,
                "\n- Hospital: {} (Start: {}, End: {})",
                or_unknown(r.hospital_name.as_deref()),
                short_time(r.hospital_shift_start_time.as_deref()),
                short_time(r.hospital_shift_end_time.as_deref()),
            );
            if let Some(specialties) = &r.specialties {
                let specialties: Vec<&str> = specialties
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .collect();
                let _ = write!(out, ", Specialties: {}", specialties.join(", "));
            }
            if let Some(address) = &r.address {
                let _ = write!(out, ", Address: {address}");
            }
            if let Some(phone) = &r.phone_number {
                let _ = write!(out, ", Phone: {phone}");
            }
        }
    }
    out
}

pub struct HospitalShiftsExecutor {
    pool: PgPool,
    config: QueryConfig,
}

impl HospitalShiftsExecutor {
    pub fn new(pool: PgPool, config: QueryConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl QueryExecutor for HospitalShiftsExecutor {
    fn tool(&self) -> ToolName {
        ToolName::HospitalShifts
    }

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolResult, ToolFailed> {
        let ToolInvocation::HospitalShifts(params) = invocation else {
            return Err(mismatch(self.tool(), invocation));
        };
        if !params.specialties.is_empty() {
            tracing::debug!(
                specialties = ?params.specialties,
                "Specialties are not filtered, passing all shifts"
            );
        }
        let rows = fetch(
            &self.pool,
            self.config.db_timeout,
            self.tool(),
            statement(params, &self.config),
        )
        .await?;
        Ok(ToolResult::new(
            self.tool(),
            Records::HospitalShifts(rows),
            self.config.result_limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_columns_blank_unless_requested() {
        let config = QueryConfig::default();
        let hidden = statement(&HospitalShiftsParams::default(), &config);
        assert!(hidden.sql().contains("NULL::text AS address, NULL::text AS phone_number"));

        let shown = statement(
            &HospitalShiftsParams {
                include_contact_info: true,
                ..HospitalShiftsParams::default()
            },
            &config,
        );
        assert!(shown.sql().contains(", address, phone_number FROM"));
    }

    #[test]
    fn test_time_bounds_and_names() {
        let params = HospitalShiftsParams {
            hospital_names: vec!["Παπαγεωργίου".to_string()],
            start_time: NaiveTime::from_hms_opt(8, 0, 0),
            end_time: NaiveTime::from_hms_opt(20, 0, 0),
            specialties: vec!["Καρδιολογία".to_string()],
            ..HospitalShiftsParams::default()
        };
        let qb = statement(&params, &QueryConfig::default());
        let sql = qb.sql();
        assert!(sql.contains(
            "(similarity(normalized_hospital_name, $1) > $2 OR normalized_hospital_name ~* $3) \
             AND hospital_shift_start_time >= $4 AND hospital_shift_end_time <= $5"
        ));
        assert!(!sql.contains("specialties ~*"));
        assert!(sql.ends_with("ORDER BY hospital_shift_date, hospital_name, id LIMIT $6"));
    }

    #[test]
    fn test_render_always_has_times() {
        let row = HospitalShiftRow {
            id: 1,
            hospital_shift_date: NaiveDate::from_ymd_opt(2026, 10, 19),
            hospital_name: Some("ΑΧΕΠΑ".to_string()),
            specialties: Some("Παθολογική\nΧειρουργική".to_string()),
            hospital_shift_start_time: Some("08:00:00".to_string()),
            hospital_shift_end_time: Some("08:00:00".to_string()),
            address: None,
            phone_number: None,
        };
        let text = render(&[row]);
        assert!(text.contains("- Hospital: ΑΧΕΠΑ (Start: 08:00, End: 08:00)"));
        assert!(text.contains("Specialties: Παθολογική, Χειρουργική"));
        assert!(!text.contains("Phone"));
    }
}
