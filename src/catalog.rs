//! Tool catalog
//!
//! Static description of every structured-data tool: its name, parameter
//! schema and result shape. The same table drives the prompt text, the
//! schema used for constrained decoding and parameter validation.

pub mod params;

pub use params::{
    DateFilter, HospitalShiftsParams, MoviesParams, OutagesParams, ParamError, PerformancesParams,
    ToolInvocation,
};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::{self, Write};

/// Closed set of tools the agent may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    Outages,
    Performances,
    Movies,
    HospitalShifts,
    History,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::Outages,
        ToolName::Performances,
        ToolName::Movies,
        ToolName::HospitalShifts,
        ToolName::History,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Outages => "outages",
            ToolName::Performances => "performances",
            ToolName::Movies => "movies",
            ToolName::HospitalShifts => "hospital_shifts",
            ToolName::History => "history",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter type constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    TextList,
    /// `YYYY-MM-DD` strings
    DateList,
    /// `HH:MM` or `HH:MM:SS`
    Time,
    Bool,
    Integer,
    Choice(&'static [&'static str]),
    /// List whose items come from a closed set
    ChoiceList(&'static [&'static str]),
}

impl ParamKind {
    fn label(self) -> String {
        match self {
            ParamKind::Text => "text".to_string(),
            ParamKind::TextList => "list of text".to_string(),
            ParamKind::DateList => "list of dates YYYY-MM-DD".to_string(),
            ParamKind::Time => "time HH:MM:SS".to_string(),
            ParamKind::Bool => "boolean".to_string(),
            ParamKind::Integer => "integer".to_string(),
            ParamKind::Choice(options) => format!("one of {}", options.join(" | ")),
            ParamKind::ChoiceList(options) => format!("list of {}", options.join(" | ")),
        }
    }

    fn schema(self) -> Value {
        match self {
            ParamKind::Text | ParamKind::Time => json!({"type": "string"}),
            ParamKind::TextList | ParamKind::DateList => {
                json!({"type": "array", "items": {"type": "string"}})
            }
            ParamKind::Bool => json!({"type": "boolean"}),
            ParamKind::Integer => json!({"type": "integer"}),
            ParamKind::Choice(options) => json!({"type": "string", "enum": options}),
            ParamKind::ChoiceList(options) => {
                json!({"type": "array", "items": {"type": "string", "enum": options}})
            }
        }
    }
}

/// Question asked when a required parameter is missing
#[derive(Debug, Clone, Copy)]
pub struct Question {
    pub el: &'static str,
    pub en: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
    pub question: Option<Question>,
}

const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
        description,
        question: None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    /// Fields of each returned record
    pub result_shape: &'static [&'static str],
}

impl ToolDescriptor {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

static TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: ToolName::Outages,
        description: "Scheduled power and water outages in Thessaloniki.",
        params: &[
            optional("outage_dates", ParamKind::DateList, "Outage dates; [\"*\"] for any date."),
            optional("outage_type", ParamKind::Choice(&["power", "water", "*"]), "Outage type."),
            optional("locations", ParamKind::TextList, "Locations exactly as the user wrote them."),
            optional(
                "affected_areas",
                ParamKind::TextList,
                "Neighbourhoods or areas exactly as the user wrote them.",
            ),
        ],
        result_shape: &["date", "type", "location", "affected_areas", "start", "end"],
    },
    ToolDescriptor {
        name: ToolName::Performances,
        description: "Musical concerts and theatrical plays in Thessaloniki.",
        params: &[
            optional("performance_dates", ParamKind::DateList, "Performance dates; [\"*\"] for any."),
            optional("performance_names", ParamKind::TextList, "Performance titles as written."),
            optional("performance_locations", ParamKind::TextList, "Venues, in Greek."),
            optional(
                "performance_type",
                ParamKind::Choice(&["musical", "theatrical", "*"]),
                "Performance type.",
            ),
        ],
        result_shape: &["date", "name", "location", "type", "start_time"],
    },
    ToolDescriptor {
        name: ToolName::Movies,
        description: "Movie screening schedules for specific cinemas.",
        params: &[
            optional("screening_dates", ParamKind::DateList, "Screening dates; [\"*\"] for any."),
            optional("movies", ParamKind::TextList, "Movie titles; [\"*\"] for any movie."),
            ParamSpec {
                name: "cinemas",
                kind: ParamKind::ChoiceList(&["Village", "Odeon", "Cineplexx", "*"]),
                required: true,
                description: "Cinemas: Village (Mediterranean Cosmos), Odeon, Cineplexx.",
                question: Some(Question {
                    el: "Για ποιον κινηματογράφο θέλετε να δείτε το πρόγραμμα (Village, Odeon ή Cineplexx);",
                    en: "Which cinema would you like the schedule for (Village, Odeon or Cineplexx)?",
                }),
            },
            optional(
                "halls_and_screening_times",
                ParamKind::Bool,
                "True only when the user asks for times, halls or names a specific movie.",
            ),
            optional("genres", ParamKind::TextList, "Movie genres; [\"*\"] for any."),
            optional("year", ParamKind::Integer, "Release year, if the user gives one."),
        ],
        result_shape: &["date", "cinema", "movie", "time", "hall", "genre", "year"],
    },
    ToolDescriptor {
        name: ToolName::HospitalShifts,
        description: "On-duty hospital shifts and emergency departments in Thessaloniki.",
        params: &[
            optional("hospital_shift_dates", ParamKind::DateList, "Shift dates; [\"*\"] for any."),
            optional("hospital_names", ParamKind::TextList, "Hospital names as written."),
            optional("hospital_shifts_start_time", ParamKind::Time, "Earliest shift start."),
            optional("hospital_shifts_end_time", ParamKind::Time, "Latest shift end."),
            optional("specialties", ParamKind::TextList, "Medical specialties of interest."),
            optional(
                "include_contact_info",
                ParamKind::Bool,
                "True only when the user asks for address or phone.",
            ),
        ],
        result_shape: &["date", "hospital", "start", "end", "specialties", "address", "phone"],
    },
    ToolDescriptor {
        name: ToolName::History,
        description: "Documented history of Thessaloniki: landmarks, events and heritage.",
        params: &[ParamSpec {
            name: "search_query",
            kind: ParamKind::Text,
            required: true,
            description: "The historical question, rephrased as a search query.",
            question: Some(Question {
                el: "Για ποιο κομμάτι της ιστορίας της Θεσσαλονίκης θα θέλατε να μάθετε;",
                en: "Which part of Thessaloniki's history would you like to know about?",
            }),
        }],
        result_shape: &["passage", "similarity"],
    },
];

/// Read-only view over the tool table
#[derive(Debug, Clone, Copy)]
pub struct ToolCatalog {
    tools: &'static [ToolDescriptor],
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self { tools: TOOLS }
    }
}

impl ToolCatalog {
    pub fn get(&self, name: ToolName) -> Option<&'static ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Plain-text tool listing for the intent prompt
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for tool in self.tools {
            let _ = writeln!(out, "- {}: {}", tool.name, tool.description);
            for p in tool.params {
                let presence = if p.required { "required" } else { "optional" };
                let _ = writeln!(
                    out,
                    "    {} ({}, {}): {}",
                    p.name,
                    p.kind.label(),
                    presence,
                    p.description
                );
            }
            let _ = writeln!(out, "    returns: {}", tool.result_shape.join(", "));
        }
        out
    }

    /// JSON schema the intent model call is constrained to
    pub fn intent_schema(&self) -> Value {
        let names: Vec<&str> = self.tools.iter().map(|t| t.name.as_str()).collect();

        let mut arguments = Map::new();
        for tool in self.tools {
            for p in tool.params {
                let mut schema = p.kind.schema();
                if let Value::Object(obj) = &mut schema {
                    obj.insert(
                        "description".to_string(),
                        Value::String(format!("[{}] {}", tool.name, p.description)),
                    );
                }
                arguments.insert(p.name.to_string(), schema);
            }
        }

        json!({
            "type": "object",
            "properties": {
                "kind": {
                    "type": "string",
                    "enum": ["direct_answer", "tool_call", "clarify"],
                },
                "text": {
                    "type": "string",
                    "description": "Reply for direct_answer, question for clarify, empty for tool_call.",
                },
                "tool": {
                    "type": "string",
                    "enum": names,
                },
                "arguments": {
                    "type": "object",
                    "properties": Value::Object(arguments),
                },
            },
            "required": ["kind", "text"],
        })
    }
}
