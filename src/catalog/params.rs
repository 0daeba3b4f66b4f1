//! Typed tool parameters
//!
//! Model-supplied arguments are validated here before any query is built.
//! `"*"` and empty entries mean "any" and are dropped during parsing, so
//! an empty list downstream always means "no filter".

use super::ToolName;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Value};
use thiserror::Error;

const WILDCARD: &str = "*";

/// Cinemas the screening data covers
pub const CINEMAS: &[&str] = &["Village", "Odeon", "Cineplexx"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("arguments for {0} must be a JSON object")]
    NotAnObject(ToolName),
    #[error("{tool}: missing required parameter `{param}`")]
    Missing {
        tool: ToolName,
        param: &'static str,
    },
    #[error("{tool}: invalid `{param}`: {reason}")]
    Invalid {
        tool: ToolName,
        param: &'static str,
        reason: String,
    },
}

/// Date restriction of a query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    Any,
    On(Vec<NaiveDate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutageType {
    Power,
    Water,
}

impl OutageType {
    pub fn as_str(self) -> &'static str {
        match self {
            OutageType::Power => "power",
            OutageType::Water => "water",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceType {
    Musical,
    Theatrical,
}

impl PerformanceType {
    pub fn as_str(self) -> &'static str {
        match self {
            PerformanceType::Musical => "musical",
            PerformanceType::Theatrical => "theatrical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutagesParams {
    pub dates: DateFilter,
    pub outage_type: Option<OutageType>,
    pub locations: Vec<String>,
    pub affected_areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PerformancesParams {
    pub dates: DateFilter,
    pub names: Vec<String>,
    pub locations: Vec<String>,
    pub performance_type: Option<PerformanceType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MoviesParams {
    pub dates: DateFilter,
    pub movies: Vec<String>,
    pub cinemas: Vec<String>,
    pub halls_and_screening_times: bool,
    pub genres: Vec<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HospitalShiftsParams {
    pub dates: DateFilter,
    pub hospital_names: Vec<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub specialties: Vec<String>,
    pub include_contact_info: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryParams {
    pub search_query: String,
}

/// A validated tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    Outages(OutagesParams),
    Performances(PerformancesParams),
    Movies(MoviesParams),
    HospitalShifts(HospitalShiftsParams),
    History(HistoryParams),
}

impl ToolInvocation {
    pub fn tool_name(&self) -> ToolName {
        match self {
            ToolInvocation::Outages(_) => ToolName::Outages,
            ToolInvocation::Performances(_) => ToolName::Performances,
            ToolInvocation::Movies(_) => ToolName::Movies,
            ToolInvocation::HospitalShifts(_) => ToolName::HospitalShifts,
            ToolInvocation::History(_) => ToolName::History,
        }
    }

    /// Validate raw model arguments for `tool`.
    ///
    /// Type errors are `Invalid`; a required parameter that is absent or
    /// only a wildcard is `Missing`.
    pub fn parse(tool: ToolName, arguments: &Value) -> Result<Self, ParamError> {
        let empty = Map::new();
        let map = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(ParamError::NotAnObject(tool)),
        };
        let args = Args { tool, map };

        let invocation = match tool {
            ToolName::Outages => ToolInvocation::Outages(OutagesParams {
                dates: args.dates("outage_dates")?,
                outage_type: args
                    .choice("outage_type", &["power", "water"])?
                    .map(|t| if t == "power" { OutageType::Power } else { OutageType::Water }),
                locations: args.text_list("locations")?,
                affected_areas: args.text_list("affected_areas")?,
            }),
            ToolName::Performances => ToolInvocation::Performances(PerformancesParams {
                dates: args.dates("performance_dates")?,
                names: args.text_list("performance_names")?,
                locations: args.text_list("performance_locations")?,
                performance_type: args
                    .choice("performance_type", &["musical", "theatrical"])?
                    .map(|t| {
                        if t == "musical" {
                            PerformanceType::Musical
                        } else {
                            PerformanceType::Theatrical
                        }
                    }),
            }),
            ToolName::Movies => {
                let cinemas = args.choice_list("cinemas", CINEMAS)?;
                if cinemas.is_empty() {
                    return Err(args.missing("cinemas"));
                }
                ToolInvocation::Movies(MoviesParams {
                    dates: args.dates("screening_dates")?,
                    movies: args.text_list("movies")?,
                    cinemas,
                    halls_and_screening_times: args.boolean("halls_and_screening_times")?,
                    genres: args.text_list("genres")?,
                    year: args.integer("year")?,
                })
            }
            ToolName::HospitalShifts => ToolInvocation::HospitalShifts(HospitalShiftsParams {
                dates: args.dates("hospital_shift_dates")?,
                hospital_names: args.text_list("hospital_names")?,
                start_time: args.time("hospital_shifts_start_time")?,
                end_time: args.time("hospital_shifts_end_time")?,
                specialties: args.text_list("specialties")?,
                include_contact_info: args.boolean("include_contact_info")?,
            }),
            ToolName::History => ToolInvocation::History(HistoryParams {
                search_query: args
                    .text("search_query")?
                    .ok_or_else(|| args.missing("search_query"))?,
            }),
        };
        Ok(invocation)
    }
}

struct Args<'a> {
    tool: ToolName,
    map: &'a Map<String, Value>,
}

impl Args<'_> {
    fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    fn missing(&self, param: &'static str) -> ParamError {
        ParamError::Missing {
            tool: self.tool,
            param,
        }
    }

    fn invalid(&self, param: &'static str, reason: impl Into<String>) -> ParamError {
        ParamError::Invalid {
            tool: self.tool,
            param,
            reason: reason.into(),
        }
    }

    /// Trimmed string, `None` for absent, empty or wildcard
    fn text(&self, name: &'static str) -> Result<Option<String>, ParamError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(meaningful(s)),
            Some(other) => Err(self.invalid(name, format!("expected string, got {other}"))),
        }
    }

    /// List of strings; a bare string counts as a one-element list
    fn text_list(&self, name: &'static str) -> Result<Vec<String>, ParamError> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(meaningful(s).into_iter().collect()),
            Some(Value::Array(items)) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => Ok(meaningful(s)),
                    other => Err(self.invalid(name, format!("expected string item, got {other}"))),
                })
                .filter_map(Result::transpose)
                .collect(),
            Some(other) => Err(self.invalid(name, format!("expected list, got {other}"))),
        }
    }

    fn dates(&self, name: &'static str) -> Result<DateFilter, ParamError> {
        let raw = self.text_list(name)?;
        if raw.is_empty() {
            return Ok(DateFilter::Any);
        }
        let mut dates = raw
            .iter()
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| self.invalid(name, format!("`{s}` is not a YYYY-MM-DD date")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        dates.sort_unstable();
        dates.dedup();
        Ok(DateFilter::On(dates))
    }

    fn choice(
        &self,
        name: &'static str,
        allowed: &[&'static str],
    ) -> Result<Option<&'static str>, ParamError> {
        let Some(value) = self.text(name)? else {
            return Ok(None);
        };
        let lowered = value.to_lowercase();
        allowed
            .iter()
            .copied()
            .find(|a| *a == lowered)
            .map(Some)
            .ok_or_else(|| self.invalid(name, format!("`{value}` is not one of {}", allowed.join(", "))))
    }

    /// Items matched case-insensitively and returned in canonical spelling
    fn choice_list(
        &self,
        name: &'static str,
        allowed: &[&'static str],
    ) -> Result<Vec<String>, ParamError> {
        self.text_list(name)?
            .into_iter()
            .map(|value| {
                allowed
                    .iter()
                    .find(|a| a.eq_ignore_ascii_case(&value))
                    .map(|a| (*a).to_string())
                    .ok_or_else(|| {
                        self.invalid(name, format!("`{value}` is not one of {}", allowed.join(", ")))
                    })
            })
            .collect()
    }

    fn time(&self, name: &'static str) -> Result<Option<NaiveTime>, ParamError> {
        let Some(value) = self.text(name)? else {
            return Ok(None);
        };
        NaiveTime::parse_from_str(&value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M"))
            .map(Some)
            .map_err(|_| self.invalid(name, format!("`{value}` is not a HH:MM[:SS] time")))
    }

    fn boolean(&self, name: &'static str) -> Result<bool, ParamError> {
        match self.get(name) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
            Some(other) => Err(self.invalid(name, format!("expected boolean, got {other}"))),
        }
    }

    fn integer(&self, name: &'static str) -> Result<Option<i32>, ParamError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(name, format!("`{n}` is not a valid integer"))),
            Some(Value::String(s)) => match meaningful(s) {
                None => Ok(None),
                Some(s) => s
                    .parse()
                    .map(Some)
                    .map_err(|_| self.invalid(name, format!("`{s}` is not a valid integer"))),
            },
            Some(other) => Err(self.invalid(name, format!("expected integer, got {other}"))),
        }
    }
}

fn meaningful(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == WILDCARD {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_outages_area_only() {
        let inv = ToolInvocation::parse(
            ToolName::Outages,
            &json!({"outage_type": "power", "affected_areas": ["Καλαμαριά"], "outage_dates": ["*"]}),
        )
        .unwrap();
        assert_eq!(
            inv,
            ToolInvocation::Outages(OutagesParams {
                dates: DateFilter::Any,
                outage_type: Some(OutageType::Power),
                locations: vec![],
                affected_areas: vec!["Καλαμαριά".to_string()],
            })
        );
    }

    #[test]
    fn test_wildcards_and_blanks_dropped() {
        let inv = ToolInvocation::parse(
            ToolName::Performances,
            &json!({"performance_names": ["*", " ", "Ζορμπάς"], "performance_type": "*"}),
        )
        .unwrap();
        let ToolInvocation::Performances(p) = inv else {
            panic!("wrong variant");
        };
        assert_eq!(p.names, vec!["Ζορμπάς"]);
        assert_eq!(p.performance_type, None);
    }

    #[test]
    fn test_dates_sorted_and_deduplicated() {
        let inv = ToolInvocation::parse(
            ToolName::HospitalShifts,
            &json!({"hospital_shift_dates": ["2026-10-21", "2026-10-19", "2026-10-21"]}),
        )
        .unwrap();
        let ToolInvocation::HospitalShifts(p) = inv else {
            panic!("wrong variant");
        };
        assert_eq!(p.dates, DateFilter::On(vec![date(2026, 10, 19), date(2026, 10, 21)]));
    }

    #[test]
    fn test_bad_date_is_invalid() {
        let err = ToolInvocation::parse(ToolName::Outages, &json!({"outage_dates": ["tomorrow"]}))
            .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { param: "outage_dates", .. }));
    }

    #[test]
    fn test_choice_outside_set_is_invalid() {
        let err = ToolInvocation::parse(ToolName::Outages, &json!({"outage_type": "gas"}))
            .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { param: "outage_type", .. }));
    }

    #[test]
    fn test_movies_require_cinema() {
        let err = ToolInvocation::parse(ToolName::Movies, &json!({"movies": ["*"], "cinemas": ["*"]}))
            .unwrap_err();
        assert_eq!(
            err,
            ParamError::Missing {
                tool: ToolName::Movies,
                param: "cinemas"
            }
        );
    }

    #[test]
    fn test_movies_full() {
        let inv = ToolInvocation::parse(
            ToolName::Movies,
            &json!({
                "cinemas": "odeon",
                "halls_and_screening_times": "true",
                "year": 2024,
                "genres": null
            }),
        )
        .unwrap();
        let ToolInvocation::Movies(p) = inv else {
            panic!("wrong variant");
        };
        assert_eq!(p.cinemas, vec!["Odeon"]);
        assert!(p.halls_and_screening_times);
        assert_eq!(p.year, Some(2024));
        assert!(p.genres.is_empty());
    }

    #[test]
    fn test_unknown_cinema_is_invalid() {
        let err = ToolInvocation::parse(ToolName::Movies, &json!({"cinemas": ["Ολύμπιον"]}))
            .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { param: "cinemas", .. }));

        let inv = ToolInvocation::parse(ToolName::Movies, &json!({"cinemas": ["*", "VILLAGE"]}))
            .unwrap();
        let ToolInvocation::Movies(p) = inv else {
            panic!("wrong variant");
        };
        assert_eq!(p.cinemas, vec!["Village"]);
    }

    #[test]
    fn test_shift_times() {
        let inv = ToolInvocation::parse(
            ToolName::HospitalShifts,
            &json!({"hospital_shifts_start_time": "08:00", "hospital_shifts_end_time": "20:30:00"}),
        )
        .unwrap();
        let ToolInvocation::HospitalShifts(p) = inv else {
            panic!("wrong variant");
        };
        assert_eq!(p.start_time, NaiveTime::from_hms_opt(8, 0, 0));
        assert_eq!(p.end_time, NaiveTime::from_hms_opt(20, 30, 0));

        let err = ToolInvocation::parse(
            ToolName::HospitalShifts,
            &json!({"hospital_shifts_start_time": "morning"}),
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { .. }));
    }

    #[test]
    fn test_history_requires_query() {
        assert!(matches!(
            ToolInvocation::parse(ToolName::History, &json!({})),
            Err(ParamError::Missing { param: "search_query", .. })
        ));
        let inv =
            ToolInvocation::parse(ToolName::History, &json!({"search_query": " Λευκός Πύργος "}))
                .unwrap();
        assert_eq!(
            inv,
            ToolInvocation::History(HistoryParams {
                search_query: "Λευκός Πύργος".to_string()
            })
        );
    }

    #[test]
    fn test_null_arguments_use_defaults() {
        let inv = ToolInvocation::parse(ToolName::Outages, &Value::Null).unwrap();
        assert_eq!(inv, ToolInvocation::Outages(OutagesParams::default()));
        assert!(matches!(
            ToolInvocation::parse(ToolName::Outages, &json!([1, 2])),
            Err(ParamError::NotAnObject(ToolName::Outages))
        ));
    }

    #[test]
    fn test_wrong_item_type_is_invalid() {
        let err = ToolInvocation::parse(ToolName::Outages, &json!({"locations": [3]})).unwrap_err();
        assert!(matches!(err, ParamError::Invalid { param: "locations", .. }));
    }
}
