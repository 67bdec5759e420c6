//! Completeness check of the resolved record against the fixed checklist.

use serde::Serialize;

use crate::checklist::FieldId;
use crate::pipeline::types::{Confidence, ResolvedRecord, ValueStatus};

/// Per-field completeness classification, in checklist order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletenessReport {
    pub present: Vec<FieldId>,
    pub missing: Vec<FieldId>,
    /// Human-readable flags for present-but-suspect fields.
    pub warnings: Vec<String>,
}

/// Classify every checklist field as present or missing, flagging present
/// fields that still deserve a second look. One warning per field at most;
/// an explicit no-data / not-applicable status is a clean answer, not a flag.
pub fn validate(record: &ResolvedRecord) -> CompletenessReport {
    let mut report = CompletenessReport::default();

    for (field, candidate) in record.iter() {
        let Some(candidate) = candidate else {
            report.missing.push(field);
            continue;
        };

        let label = field.label();
        if matches!(
            candidate.status,
            ValueStatus::NoData | ValueStatus::NotApplicable
        ) {
            // An explicit "nothing to report" is a complete answer.
        } else if candidate.source.confidence == Some(Confidence::Low) {
            report
                .warnings
                .push(format!("{label} — read with low confidence"));
        } else if candidate.note.to_uppercase().contains("OCR") {
            report
                .warnings
                .push(format!("{label} — possible OCR error, needs review"));
        } else if candidate.status == ValueStatus::Conflict {
            report.warnings.push(format!("{label} — sources disagree"));
        }
        report.present.push(field);
    }

    report
}
