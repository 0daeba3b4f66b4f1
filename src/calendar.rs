//! Local date context for prompts
//!
//! The guide's data is keyed by Thessaloniki local dates, so relative
//! expressions ("tomorrow", "this weekend") must resolve against
//! Europe/Athens rather than the server clock.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use std::fmt::Write;

const WINTER_OFFSET_HOURS: i64 = 2;
const SUMMER_OFFSET_HOURS: i64 = 3;

/// Wall-clock time in Europe/Athens for the given instant.
///
/// EU rule: summer time from 01:00 UTC on the last Sunday of March to
/// 01:00 UTC on the last Sunday of October.
pub fn athens_local(at: DateTime<Utc>) -> NaiveDateTime {
    let utc = at.naive_utc();
    let year = utc.year();
    let summer = match (transition(year, 3), transition(year, 10)) {
        (Some(start), Some(end)) => utc >= start && utc < end,
        _ => false,
    };
    let hours = if summer {
        SUMMER_OFFSET_HOURS
    } else {
        WINTER_OFFSET_HOURS
    };
    utc + TimeDelta::hours(hours)
}

/// 01:00 UTC on the last Sunday of `month`
fn transition(year: i32, month: u32) -> Option<NaiveDateTime> {
    let last_day = NaiveDate::from_ymd_opt(year, month + 1, 1)?.pred_opt()?;
    let back = last_day.weekday().num_days_from_sunday();
    last_day
        .checked_sub_days(Days::new(u64::from(back)))?
        .and_hms_opt(1, 0, 0)
}

/// Date block injected into model prompts
#[derive(Debug, Clone, Copy)]
pub struct DateContext {
    now: NaiveDateTime,
}

impl DateContext {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            now: athens_local(instant),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// Current local time plus the next seven days with weekday names
    pub fn prompt_block(&self) -> String {
        let mut out = format!(
            "Current date and time (Europe/Athens): {}\nUpcoming week:",
            self.now.format("%Y-%m-%d %H:%M (%A)")
        );
        let mut day = self.today();
        for _ in 0..7 {
            let _ = write!(out, "\n{}", day.format("%A: %Y-%m-%d"));
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        out
    }
}
