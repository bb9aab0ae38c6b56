//! The sensor record schema: required fields, validation and row rendering.

use serde_json::Value;

/// Expected primitive kind of a required record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Float,
    Int,
    Str,
}

/// An ordered set of required field names with their expected kinds.
pub type Schema = &'static [(&'static str, FieldKind)];

/// The required fields of one sensor record.
pub const RECORD_SCHEMA: Schema = &[
    ("x", FieldKind::Float),
    ("y", FieldKind::Float),
    ("z", FieldKind::Float),
    ("t", FieldKind::Int),
    ("key", FieldKind::Str),
    ("sensor-type", FieldKind::Str),
];

/// Column order of the persisted rows.
pub const CSV_HEADER: [&str; 5] = ["x", "y", "z", "t", "key"];

/// Checks `record` against the required-field schema.
///
/// Presence-only: a field counts as present when it exists and is not
/// `null`. Values are not checked against the declared kinds.
pub fn validate(record: &Value, schema: Schema) -> bool {
    let Some(map) = record.as_object() else {
        return false;
    };

    schema
        .iter()
        .all(|(name, _)| map.get(*name).is_some_and(|v| !v.is_null()))
}

/// Routing tag carried in a record's `sensor-type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    Accelerometer,
    Gyroscope,
    /// End-of-stream sentinel: the producer is done, no data attached.
    Terminate,
    /// Any other tag. Ignored rather than rejected.
    Unknown,
}

impl SensorType {
    /// Reads the routing tag out of a record.
    pub fn of(record: &Value) -> Self {
        match record["sensor-type"].as_str() {
            Some("accelerometer") => Self::Accelerometer,
            Some("gyroscope") => Self::Gyroscope,
            Some("terminate") => Self::Terminate,
            _ => Self::Unknown,
        }
    }
}

/// Renders the `(x, y, z, t, key)` tuple of a record as one CSV row.
///
/// Numbers and strings render bare; any other value is written as compact
/// JSON so the row stays readable.
pub fn csv_row(record: &Value) -> [String; 5] {
    [
        csv_field(&record["x"]),
        csv_field(&record["y"]),
        csv_field(&record["z"]),
        csv_field(&record["t"]),
        csv_field(&record["key"]),
    ]
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
