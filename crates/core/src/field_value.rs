use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::file_ref::FileRef;

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "text")]
    ShortText,
    #[serde(rename = "longtext")]
    LongText,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "file")]
    File,
}

impl FieldType {
    pub const ALL: [FieldType; 7] = [
        Self::ShortText,
        Self::LongText,
        Self::Number,
        Self::Boolean,
        Self::Date,
        Self::Json,
        Self::File,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortText => "text",
            Self::LongText => "longtext",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Json => "json",
            Self::File => "file",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownFieldType(s.to_string()))
    }
}

/// A data-bag value interpreted through its field's declared type.
///
/// `Other` carries values whose JSON shape does not fit the declared type
/// (type changed after data was written, or data written by another client).
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    Json(Value),
    File(FileRef),
    Other(Value),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b).is_eq(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::File(a), Self::File(b)) => a == b,
            (Self::Other(a), Self::Other(b)) => a == b,
            _ => false,
        }
    }
}

/// Null and the empty string both count as "no value".
pub fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

impl FieldValue {
    /// Interpret a raw bag value for a field of type `field_type`.
    /// Returns `None` for blank values.
    pub fn interpret(field_type: FieldType, raw: &Value) -> Option<Self> {
        if is_blank(raw) {
            return None;
        }
        let value = match field_type {
            FieldType::ShortText | FieldType::LongText => match raw {
                Value::String(s) => Self::Text(s.clone()),
                Value::Number(n) => Self::Text(n.to_string()),
                Value::Bool(b) => Self::Text(b.to_string()),
                other => Self::Other(other.clone()),
            },
            FieldType::Number => match raw {
                Value::Number(n) => n
                    .as_f64()
                    .map(Self::Number)
                    .unwrap_or_else(|| Self::Other(raw.clone())),
                // Numbers typed into text inputs arrive as strings.
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(Self::Number)
                    .unwrap_or_else(|| Self::Other(raw.clone())),
                other => Self::Other(other.clone()),
            },
            FieldType::Boolean => match raw {
                Value::Bool(b) => Self::Boolean(*b),
                Value::String(s) if s == "true" => Self::Boolean(true),
                Value::String(s) if s == "false" => Self::Boolean(false),
                other => Self::Other(other.clone()),
            },
            FieldType::Date => match raw {
                Value::String(s) => parse_date(s)
                    .map(Self::Date)
                    .unwrap_or_else(|| Self::Other(raw.clone())),
                other => Self::Other(other.clone()),
            },
            FieldType::Json => Self::Json(raw.clone()),
            FieldType::File => match raw {
                Value::String(s) => Self::File(FileRef::new(s.clone())),
                other => Self::Other(other.clone()),
            },
        };
        Some(value)
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}
