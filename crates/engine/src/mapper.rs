use std::fmt;

use serde_json::Value;

use flexdata_core::{DataBag, FieldDef, FieldType, FieldValue, FileRef};

use crate::error::ValidationError;

/// Presentation of one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// No value and no type-specific placeholder.
    Empty,
    Text(String),
    Flag(bool),
    File { url: String, name: String, image: bool },
    /// A file field without a file.
    NoFile,
    /// Structured value rendered as compact JSON.
    Json(String),
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::Text(s) | Self::Json(s) => f.write_str(s),
            Self::Flag(true) => f.write_str("YES"),
            Self::Flag(false) => f.write_str("NO"),
            Self::File { name, .. } => f.write_str(name),
            Self::NoFile => f.write_str("No file"),
        }
    }
}

/// A rendered cell with the label it is shown under.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub key: String,
    pub label: String,
    pub value: Rendered,
}

/// Render `raw` through `field`'s declared type. Absent or blank values get
/// the type's placeholder.
pub fn render_value(field: &FieldDef, raw: Option<&Value>) -> Rendered {
    let Some(value) = raw.and_then(|raw| FieldValue::interpret(field.field_type, raw)) else {
        return placeholder(field.field_type);
    };
    match value {
        FieldValue::Text(s) => Rendered::Text(s),
        FieldValue::Number(n) => Rendered::Text(n.to_string()),
        FieldValue::Boolean(b) => Rendered::Flag(b),
        FieldValue::Date(d) => Rendered::Text(d.format("%Y-%m-%d").to_string()),
        FieldValue::Json(v) => Rendered::Json(v.to_string()),
        FieldValue::File(file) => render_file(&file),
        FieldValue::Other(v) => render_orphan(Some(&v)),
    }
}

/// Render a value whose field no longer exists (or whose shape does not
/// match its field's type).
pub fn render_orphan(raw: Option<&Value>) -> Rendered {
    match raw {
        None | Some(Value::Null) => Rendered::Empty,
        Some(Value::String(s)) => Rendered::Text(s.clone()),
        Some(v @ (Value::Object(_) | Value::Array(_))) => Rendered::Json(v.to_string()),
        Some(v) => Rendered::Text(v.to_string()),
    }
}

fn placeholder(field_type: FieldType) -> Rendered {
    match field_type {
        FieldType::ShortText | FieldType::LongText | FieldType::Number => {
            Rendered::Text(String::new())
        }
        FieldType::Boolean => Rendered::Flag(false),
        FieldType::File => Rendered::NoFile,
        FieldType::Date | FieldType::Json => Rendered::Empty,
    }
}

fn render_file(file: &FileRef) -> Rendered {
    Rendered::File {
        url: file.url().to_string(),
        name: file.display_name().to_string(),
        image: file.is_image(),
    }
}

/// Render a whole data bag: one cell per field in field order, then one
/// cell per key no field claims, in key order.
pub fn render_record(fields: &[FieldDef], bag: &DataBag) -> Vec<Cell> {
    let mut cells: Vec<Cell> = fields
        .iter()
        .map(|field| Cell {
            key: field.key.to_string(),
            label: field.display_label().to_string(),
            value: render_value(field, bag.get(field.key.as_str())),
        })
        .collect();

    let mut orphans: Vec<(&str, &Value)> = bag
        .iter()
        .filter(|(key, _)| !fields.iter().any(|f| f.key.as_str() == *key))
        .collect();
    orphans.sort_by_key(|(key, _)| *key);
    cells.extend(orphans.into_iter().map(|(key, raw)| Cell {
        key: key.to_string(),
        label: key.to_string(),
        value: render_orphan(Some(raw)),
    }));
    cells
}

/// Check a new row before it is sent: every required field needs a
/// non-blank value, and the bag needs at least one.
pub fn validate_for_create(fields: &[FieldDef], bag: &DataBag) -> Result<(), ValidationError> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|f| f.required && !bag.has_value(f.key.as_str()))
        .map(|f| f.display_label().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingRequired(missing));
    }
    if !bag.has_any_value() {
        return Err(ValidationError::EmptySubmission);
    }
    Ok(())
}
