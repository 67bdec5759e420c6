//! Parsing and best-effort repair of raw oracle replies.
//!
//! The oracle is asked for a mapping keyed by snake field identifiers, but
//! under load it also produces a list of `{param_id: "A.1", ...}` objects,
//! bare string values, and nulls in string positions. Everything repairable
//! is repaired here; unknown identifiers are dropped with a warning; only a
//! reply with no usable shape at all is an error.

use serde_json::Value;
use thiserror::Error;

use crate::checklist::FieldId;
use crate::pipeline::types::{FieldCandidate, PartialRecord};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Oracle reply has unusable shape: {0}")]
    WrongShape(String),
}

/// Parse one extraction reply into recognized checklist fields.
///
/// An empty record is a valid outcome: the chunk may genuinely contain
/// nothing reportable.
pub fn parse_partial_record(raw: &Value) -> Result<PartialRecord, ParseError> {
    let entries: Vec<(FieldId, Value)> = match raw {
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, value)| match FieldId::parse(key) {
                Some(field) => Some((field, value.clone())),
                None => {
                    tracing::warn!(key = %key, "Unknown field identifier in oracle reply");
                    None
                }
            })
            .collect(),
        // Repair: list of objects keyed by short parameter id.
        Value::Array(items) => {
            tracing::info!("Oracle returned a list instead of a mapping, remapping by param_id");
            items
                .iter()
                .filter_map(|item| {
                    let obj = item.as_object()?;
                    let param_id = obj.get("param_id").and_then(Value::as_str).unwrap_or("");
                    match FieldId::from_param_id(param_id) {
                        Some(field) => {
                            let mut rest = obj.clone();
                            rest.remove("param_id");
                            Some((field, Value::Object(rest)))
                        }
                        None => {
                            tracing::warn!(param_id = %param_id, "Unknown param_id in oracle reply");
                            None
                        }
                    }
                })
                .collect()
        }
        other => {
            return Err(ParseError::WrongShape(format!(
                "expected mapping or list, got {}",
                json_kind(other)
            )))
        }
    };

    let mut record = PartialRecord::new();
    for (field, value) in entries {
        match candidate_from_value(value) {
            Some(candidate) if !candidate.trimmed_value().is_empty() => {
                record.insert(field, candidate);
            }
            Some(_) => {} // empty value, nothing extracted for this field
            None => {
                tracing::warn!(field = %field, "Dropping unusable field entry in oracle reply");
            }
        }
    }
    Ok(record)
}

/// A field entry should be an object; a bare string is repaired into a
/// value-only candidate, a null means "not found".
fn candidate_from_value(value: Value) -> Option<FieldCandidate> {
    match value {
        Value::Null => Some(FieldCandidate::new("", Default::default())),
        Value::String(s) => Some(FieldCandidate::new(s, Default::default())),
        Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
