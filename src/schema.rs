//! Output contracts the model must satisfy, and the strict checker that enforces them.
//!
//! Contracts are plain `static` data. The same definition is rendered into the backend's
//! response schema and used to validate whatever comes back.

use serde_json::{Map, Value, json};

use crate::error::DecodeFailure;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    String,
    Integer,
    Number,
    Object(&'static [Field]),
    Array(&'static Kind),
}

impl Kind {
    fn label(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Integer => "integer",
            Kind::Number => "number",
            Kind::Object(_) => "object",
            Kind::Array(_) => "array",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
    /// Numeric fields that may not go below zero.
    pub unsigned: bool,
    /// String fields that may not be blank.
    pub non_empty: bool,
    pub description: Option<&'static str>,
}

const fn field(name: &'static str, kind: Kind) -> Field {
    Field {
        name,
        kind,
        required: true,
        unsigned: false,
        non_empty: false,
        description: None,
    }
}

impl Field {
    const fn optional(self) -> Self {
        Field {
            required: false,
            ..self
        }
    }

    const fn unsigned(self) -> Self {
        Field {
            unsigned: true,
            ..self
        }
    }

    const fn non_empty(self) -> Self {
        Field {
            non_empty: true,
            ..self
        }
    }

    const fn describe(self, description: &'static str) -> Self {
        Field {
            description: Some(description),
            ..self
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Contract {
    pub name: &'static str,
    pub fields: &'static [Field],
}

// ───────────────────────────────────────────────────────────────────────────────
// Field groups
// ───────────────────────────────────────────────────────────────────────────────

const PROFILE: &[Field] = &[
    field("role", Kind::String),
    field("battingStyle", Kind::String),
    field("bowlingStyle", Kind::String),
];

const CAREER_SUMMARY: &[Field] = &[
    field("matches", Kind::Integer).unsigned(),
    field("runs", Kind::Integer).unsigned(),
    field("wickets", Kind::Integer).unsigned(),
    field("battingAverage", Kind::Number).unsigned(),
    field("strikeRate", Kind::Number).unsigned(),
    field("hundreds", Kind::Integer).unsigned(),
    field("fifties", Kind::Integer).unsigned(),
    field("bestBowling", Kind::String),
];

const TIME_SERIES_POINT_FIELDS: &[Field] = &[
    field("year", Kind::Integer),
    field("runs", Kind::Integer).unsigned(),
    field("average", Kind::Number).unsigned(),
];

const TIME_SERIES_POINT: Kind = Kind::Object(TIME_SERIES_POINT_FIELDS);

const DISMISSAL_FIELDS: &[Field] = &[
    field("method", Kind::String),
    field("count", Kind::Integer).unsigned(),
];

const DISMISSAL: Kind = Kind::Object(DISMISSAL_FIELDS);

const DISTRIBUTION_SLICE_FIELDS: &[Field] = &[
    field("name", Kind::String).describe("e.g., 'vs Pace', 'vs Spin', 'at Home', 'Away'"),
    field("value", Kind::Integer),
];

const DISTRIBUTION_SLICE: Kind = Kind::Object(DISTRIBUTION_SLICE_FIELDS);

const OPPONENT_PERFORMANCE_FIELDS: &[Field] = &[
    field("name", Kind::String),
    field("matches", Kind::Integer).unsigned(),
    field("runs", Kind::Integer).unsigned(),
    field("average", Kind::Number).unsigned(),
    field("wickets", Kind::Integer).unsigned().optional(),
];

const OPPONENT_PERFORMANCE: Kind = Kind::Object(OPPONENT_PERFORMANCE_FIELDS);

const FORMAT_BOWLING_FIELDS: &[Field] = &[
    field("format", Kind::String),
    field("matches", Kind::Integer).unsigned(),
    field("wickets", Kind::Integer).unsigned(),
    field("economy", Kind::Number).unsigned(),
    field("average", Kind::Number).unsigned(),
];

const FORMAT_BOWLING: Kind = Kind::Object(FORMAT_BOWLING_FIELDS);

const SOURCE_FIELDS: &[Field] = &[
    field("uri", Kind::String).non_empty(),
    field("title", Kind::String).non_empty(),
];

const SOURCE: Kind = Kind::Object(SOURCE_FIELDS);

const PLAYER_IMAGE_HINT: &str = "A public URL to an image of the player.";

// ───────────────────────────────────────────────────────────────────────────────
// Contracts
// ───────────────────────────────────────────────────────────────────────────────

pub static PLAYER_REPORT: Contract = Contract {
    name: "player_report",
    fields: &[
        field("playerName", Kind::String),
        field("playerImage", Kind::String).describe(PLAYER_IMAGE_HINT),
        field("profile", Kind::Object(PROFILE)),
        field("careerSummary", Kind::Object(CAREER_SUMMARY)),
        field("performanceOverTime", Kind::Array(&TIME_SERIES_POINT)),
        field("dismissalAnalysis", Kind::Array(&DISMISSAL)),
        field("runsDistribution", Kind::Array(&DISTRIBUTION_SLICE)),
        field("executiveSummary", Kind::String).describe(
            "A 3-point summary of actionable areas for improvement, formatted as '1. ... 2. ... 3. ...'",
        ),
        field("performanceVsCountry", Kind::Array(&OPPONENT_PERFORMANCE)),
        field("performanceVsOpponent", Kind::Array(&OPPONENT_PERFORMANCE)),
        field("bowlingStats", Kind::Array(&FORMAT_BOWLING)),
    ],
};

pub static COMPARISON: Contract = Contract {
    name: "comparison",
    fields: &[
        field("playerName", Kind::String),
        field("playerImage", Kind::String).describe(PLAYER_IMAGE_HINT),
        field("careerSummary", Kind::Object(CAREER_SUMMARY)),
    ],
};

/// Derived shape of a grounded chat answer. Never sent to the backend: the search tool
/// and a response schema cannot be combined in one call.
pub static CHAT_ANSWER: Contract = Contract {
    name: "chat_answer",
    fields: &[
        field("text", Kind::String),
        field("sources", Kind::Array(&SOURCE)),
    ],
};

impl Contract {
    /// Render as a Gemini `responseSchema` object.
    pub fn response_schema(&self) -> Value {
        object_schema(self.fields)
    }

    /// Check `doc` against every field of the contract, stopping at the first violation.
    pub fn validate(&self, doc: &Value) -> Result<(), DecodeFailure> {
        let obj = doc.as_object().ok_or_else(|| {
            DecodeFailure::violation(
                self.name,
                format!("expected object document, found {}", describe(doc)),
            )
        })?;
        check_object(self.fields, obj, "")
    }
}

fn object_schema(fields: &[Field]) -> Value {
    let mut properties = Map::new();
    for f in fields {
        properties.insert(f.name.to_string(), field_schema(f));
    }
    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();
    let ordering: Vec<&str> = fields.iter().map(|f| f.name).collect();
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
        "propertyOrdering": ordering,
    })
}

fn field_schema(f: &Field) -> Value {
    let mut schema = kind_schema(&f.kind);
    if let Some(obj) = schema.as_object_mut() {
        if let Some(description) = f.description {
            obj.insert("description".into(), json!(description));
        }
        if f.unsigned {
            obj.insert("minimum".into(), json!(0));
        }
    }
    schema
}

fn kind_schema(kind: &Kind) -> Value {
    match kind {
        Kind::String => json!({"type": "STRING"}),
        Kind::Integer => json!({"type": "INTEGER"}),
        Kind::Number => json!({"type": "NUMBER"}),
        Kind::Object(fields) => object_schema(fields),
        Kind::Array(item) => json!({"type": "ARRAY", "items": kind_schema(item)}),
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn check_object(fields: &[Field], obj: &Map<String, Value>, parent: &str) -> Result<(), DecodeFailure> {
    for f in fields {
        let path = join(parent, f.name);
        match obj.get(f.name) {
            None | Some(Value::Null) if f.required => {
                return Err(DecodeFailure::violation(path, "missing required field"));
            }
            None | Some(Value::Null) => continue,
            Some(value) => check_value(f, &f.kind, value, &path)?,
        }
    }
    Ok(())
}

fn check_value(f: &Field, kind: &Kind, value: &Value, path: &str) -> Result<(), DecodeFailure> {
    let mismatch = || {
        DecodeFailure::violation(
            path,
            format!("expected {}, found {}", kind.label(), describe(value)),
        )
    };

    match kind {
        Kind::String => {
            let s = value.as_str().ok_or_else(mismatch)?;
            if f.non_empty && s.trim().is_empty() {
                return Err(DecodeFailure::violation(path, "must not be empty"));
            }
        }
        Kind::Integer => {
            let in_range = if f.unsigned {
                value.as_u64().is_some_and(|n| u32::try_from(n).is_ok())
            } else {
                value.as_i64().is_some_and(|n| i32::try_from(n).is_ok())
            };
            if !in_range {
                if value.is_i64() || value.is_u64() {
                    return Err(DecodeFailure::violation(
                        path,
                        format!("integer {value} out of range"),
                    ));
                }
                return Err(mismatch());
            }
        }
        Kind::Number => {
            let n = value.as_f64().ok_or_else(mismatch)?;
            if f.unsigned && n < 0.0 {
                return Err(DecodeFailure::violation(
                    path,
                    format!("expected non-negative number, found {n}"),
                ));
            }
        }
        Kind::Object(fields) => {
            let obj = value.as_object().ok_or_else(mismatch)?;
            check_object(fields, obj, path)?;
        }
        Kind::Array(item) => {
            let items = value.as_array().ok_or_else(mismatch)?;
            for (i, element) in items.iter().enumerate() {
                let element_path = format!("{path}[{i}]");
                if element.is_null() {
                    return Err(DecodeFailure::violation(element_path, "null array element"));
                }
                check_value(f, item, element, &element_path)?;
            }
        }
    }
    Ok(())
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(n) if n.is_i64() && n.as_i64().is_some_and(|v| v < 0) => "negative integer",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
