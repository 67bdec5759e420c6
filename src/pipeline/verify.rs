//! The whole-document verification pass.
//!
//! After reconciliation the oracle gets one more look at the full resolved
//! summary next to the source chunks, and answers with corrections,
//! additions and observations. Only corrections may overwrite an existing
//! value; everything else fills gaps or lands in the notes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::checklist::FieldId;
use crate::pipeline::types::{
    de_flexible_page, de_null_string, Confidence, FieldCandidate, ResolvedRecord, SourceRef,
    ValueStatus,
};

// ═══════════════════════════════════════════
// Payload
// ═══════════════════════════════════════════

/// A value correction (typically an OCR mistake the second pass caught).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Correction {
    #[serde(default, deserialize_with = "de_null_string")]
    pub field: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub corrected_value: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub issue: String,
}

/// A value the chunked pass missed entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdditionalValue {
    #[serde(default, deserialize_with = "de_null_string")]
    pub field: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub value: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub file: String,
    #[serde(default, deserialize_with = "de_flexible_page")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "de_null_string")]
    pub section: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub quote: String,
}

/// A parameter the documentation genuinely does not state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissingParam {
    #[serde(default, deserialize_with = "de_null_string")]
    pub field: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub suggestion: String,
}

/// A disagreement the verification pass noticed; informational only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifiedConflict {
    #[serde(default, deserialize_with = "de_null_string")]
    pub field: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// A value derivable only indirectly (reasoning, not reading).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndirectParam {
    #[serde(default, deserialize_with = "de_null_string")]
    pub field: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub reasoning: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub suggested_value: String,
}

/// Everything the verification pass may report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationPayload {
    #[serde(default)]
    pub corrections: Vec<Correction>,
    #[serde(default)]
    pub additional_values: Vec<AdditionalValue>,
    #[serde(default)]
    pub missing_params: Vec<MissingParam>,
    #[serde(default)]
    pub conflicts: Vec<VerifiedConflict>,
    #[serde(default)]
    pub indirect_params: Vec<IndirectParam>,
}

impl VerificationPayload {
    /// Best-effort parse of a raw verification reply; None when unusable.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

// ═══════════════════════════════════════════
// Merge
// ═══════════════════════════════════════════

fn known_field(raw: &str, list: &str) -> Option<FieldId> {
    let field = FieldId::parse(raw);
    if field.is_none() {
        tracing::warn!(field = %raw, list = %list, "Unknown field in verification payload");
    }
    field
}

/// Apply a verification payload onto the resolved record.
///
/// Returns the ordered notes list; a missing payload is a no-op.
pub fn apply_verification(
    record: &mut ResolvedRecord,
    payload: Option<&VerificationPayload>,
) -> Vec<String> {
    let mut notes = Vec::new();
    let Some(payload) = payload else {
        return notes;
    };

    for item in &payload.corrections {
        let Some(field) = known_field(&item.field, "corrections") else {
            continue;
        };
        if item.corrected_value.trim().is_empty() {
            continue;
        }
        if let Some(candidate) = record.get_mut(field) {
            let previous = std::mem::replace(&mut candidate.value, item.corrected_value.clone());
            candidate.push_note(&format!("[corrected] {} (was: {previous})", item.issue));
            candidate.source.confidence = Some(Confidence::Medium);
            notes.push(format!("{} — corrected: {}", field.label(), item.issue));
            tracing::info!(
                field = %field,
                previous = %previous,
                corrected = %item.corrected_value,
                "Verification corrected a value"
            );
        }
    }

    for item in &payload.additional_values {
        let Some(field) = known_field(&item.field, "additional_values") else {
            continue;
        };
        // Only fills gaps; an existing value always wins over a late find.
        if record.is_present(field) {
            continue;
        }
        let mut candidate = FieldCandidate::new(
            item.value.clone(),
            SourceRef {
                file: item.file.clone(),
                kind: None,
                page: item.page,
                section: item.section.clone(),
                quote: item.quote.clone(),
                confidence: Some(Confidence::Medium),
            },
        );
        candidate.push_note("added by whole-document verification");
        record.insert(field, candidate);
        notes.push(format!("{} — added by verification", field.label()));
    }

    for item in &payload.missing_params {
        let Some(field) = known_field(&item.field, "missing_params") else {
            continue;
        };
        let mut note = format!("{} — not specified in the documentation.", field.label());
        if !item.suggestion.trim().is_empty() {
            note.push(' ');
            note.push_str(item.suggestion.trim());
        }
        notes.push(note);
    }

    for item in &payload.conflicts {
        let Some(field) = known_field(&item.field, "conflicts") else {
            continue;
        };
        notes.push(format!(
            "{} — sources disagree: {}",
            field.label(),
            item.values.join(", ")
        ));
    }

    for item in &payload.indirect_params {
        let Some(field) = known_field(&item.field, "indirect_params") else {
            continue;
        };
        if !record.is_present(field) {
            let mut candidate = FieldCandidate::new(
                item.suggested_value.clone(),
                SourceRef {
                    confidence: Some(Confidence::Low),
                    ..SourceRef::default()
                },
            );
            candidate.status = ValueStatus::Inferred;
            candidate.note = item.reasoning.clone();
            record.insert(field, candidate);
        }
        notes.push(format!("{} — {}", field.label(), item.reasoning));
    }

    notes
}

// ═══════════════════════════════════════════
// Summary for the verify call
// ═══════════════════════════════════════════

/// The per-field summary the oracle verifies against the source chunks.
/// Absent fields are listed with an explicit null value.
pub fn verification_summary(record: &ResolvedRecord) -> Value {
    let mut map = serde_json::Map::new();
    for (field, candidate) in record.iter() {
        let entry = match candidate {
            Some(c) => json!({
                "label": field.label(),
                "value": c.value,
                "source_file": c.source.file,
                "source_type": c.source.kind,
                "page": c.source.page,
                "section": c.source.section,
                "quote": c.source.quote,
            }),
            None => json!({ "label": field.label(), "value": null }),
        };
        map.insert(field.as_str().to_string(), entry);
    }
    Value::Object(map)
}
