//! Conflict resolution by documented source priority.
//!
//! The ranking tables are plain data on purpose: they encode policy
//! (a passport outranks a catalog outranks a manual...) and get tuned
//! independently of the selection logic.

use std::collections::BTreeSet;

use crate::checklist::FieldId;
use crate::pipeline::types::{
    Confidence, ConflictEntry, DocumentKind, FieldCandidate, ResolvedRecord, ValueStatus,
};
use crate::pipeline::PipelineError;

/// Rank for a document kind (or confidence) absent from its table.
pub const UNKNOWN_RANK: u32 = 99;

/// Source priority: lower wins.
pub const SOURCE_PRIORITY: &[(DocumentKind, u32)] = &[
    (DocumentKind::Passport, 0),
    (DocumentKind::Catalog, 1),
    (DocumentKind::Manual, 2),
    (DocumentKind::Drawing, 3),
    (DocumentKind::Document, 4),
];

/// Confidence rank: lower wins.
pub const CONFIDENCE_RANK: &[(Confidence, u32)] = &[
    (Confidence::High, 0),
    (Confidence::Medium, 1),
    (Confidence::Low, 2),
];

pub fn source_priority(kind: Option<DocumentKind>) -> u32 {
    kind.and_then(|k| {
        SOURCE_PRIORITY
            .iter()
            .find(|(entry, _)| *entry == k)
            .map(|(_, rank)| *rank)
    })
    .unwrap_or(UNKNOWN_RANK)
}

pub fn confidence_rank(confidence: Option<Confidence>) -> u32 {
    confidence
        .and_then(|c| {
            CONFIDENCE_RANK
                .iter()
                .find(|(entry, _)| *entry == c)
                .map(|(_, rank)| *rank)
        })
        .unwrap_or(UNKNOWN_RANK)
}

/// Ascending ranking key; ties broken by iteration order (first wins).
fn ranking_key(candidate: &FieldCandidate) -> (u32, u32) {
    (
        source_priority(candidate.source.kind),
        confidence_rank(candidate.source.confidence),
    )
}

/// "380 V (passport.pdf, passport); 220 V (manual.pdf, manual)"
fn conflict_details(candidates: &[FieldCandidate]) -> String {
    candidates
        .iter()
        .map(|c| {
            let kind = c
                .source
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!("{} ({}, {})", c.value, c.source.file, kind)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Pick one authoritative candidate for a field.
///
/// With several distinct values the winner still gets picked, but the field
/// is flagged as a conflict and every candidate survives as an audit entry.
/// An empty candidate list is a caller error.
pub fn resolve(
    field: FieldId,
    candidates: Vec<FieldCandidate>,
) -> Result<FieldCandidate, PipelineError> {
    if candidates.is_empty() {
        return Err(PipelineError::EmptyCandidates(field));
    }
    if candidates.len() == 1 {
        return Ok(candidates.into_iter().next().expect("len checked"));
    }

    let distinct: BTreeSet<&str> = candidates.iter().map(|c| c.trimmed_value()).collect();

    let winner_index = candidates
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| ranking_key(c))
        .map(|(i, _)| i)
        .expect("non-empty");

    if distinct.len() == 1 {
        // Repeated extraction of the same value: no conflict, best source wins.
        return Ok(candidates.into_iter().nth(winner_index).expect("in range"));
    }

    let details = conflict_details(&candidates);
    tracing::warn!(field = %field, details = %details, "Conflicting values between sources");

    let entries: Vec<ConflictEntry> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| ConflictEntry {
            value: c.value.clone(),
            source: c.source.clone(),
            selected: i == winner_index,
        })
        .collect();

    let mut winner = candidates.into_iter().nth(winner_index).expect("in range");
    winner.status = ValueStatus::Conflict;
    winner.conflicts = entries;
    winner.push_note(&format!("CONFLICT: {details}"));
    Ok(winner)
}

/// Resolve every checklist field, collecting one disagreement note per
/// conflicted field in checklist order.
pub fn resolve_all(
    mut aggregated: std::collections::BTreeMap<FieldId, Vec<FieldCandidate>>,
) -> Result<(ResolvedRecord, Vec<String>), PipelineError> {
    let mut record = ResolvedRecord::default();
    let mut notes = Vec::new();

    for field in FieldId::ALL {
        let candidates = aggregated.remove(&field).unwrap_or_default();
        if candidates.is_empty() {
            continue;
        }
        let conflict_note = if candidates.len() > 1 {
            let distinct: BTreeSet<&str> =
                candidates.iter().map(|c| c.trimmed_value()).collect();
            (distinct.len() > 1).then(|| conflict_details(&candidates))
        } else {
            None
        };

        let chosen = resolve(field, candidates)?;
        record.insert(field, chosen);

        if let Some(details) = conflict_note {
            notes.push(format!("{} — sources disagree: {details}", field.label()));
        }
    }

    Ok((record, notes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{SourceRef, ValueStatus};

    fn candidate(value: &str, kind: Option<DocumentKind>, conf: Option<Confidence>) -> FieldCandidate {
        FieldCandidate::new(
            value,
            SourceRef {
                file: format!("{}.pdf", kind.map(|k| k.as_str()).unwrap_or("unknown")),
                kind,
                confidence: conf,
                ..SourceRef::default()
            },
        )
    }

    #[test]
    fn empty_candidate_list_is_a_caller_error() {
        let result = resolve(FieldId::A1Name, vec![]);
        assert!(matches!(result, Err(PipelineError::EmptyCandidates(FieldId::A1Name))));
    }

    #[test]
    fn single_candidate_passes_through() {
        let chosen = resolve(
            FieldId::D1Power,
            vec![candidate("5 kW", Some(DocumentKind::Manual), Some(Confidence::Low))],
        )
        .unwrap();
        assert_eq!(chosen.value, "5 kW");
        assert_eq!(chosen.status, ValueStatus::Ok);
        assert!(chosen.conflicts.is_empty());
    }

    #[test]
    fn identical_values_pick_best_source_without_conflict() {
        let chosen = resolve(
            FieldId::D2Voltage,
            vec![
                candidate("380 V", Some(DocumentKind::Manual), Some(Confidence::High)),
                candidate(" 380 V ", Some(DocumentKind::Passport), Some(Confidence::Medium)),
            ],
        )
        .unwrap();
        assert_eq!(chosen.source.kind, Some(DocumentKind::Passport));
        assert_eq!(chosen.status, ValueStatus::Ok);
        assert!(chosen.conflicts.is_empty());
    }

    #[test]
    fn distinct_values_flag_a_conflict_with_full_audit() {
        let chosen = resolve(
            FieldId::D2Voltage,
            vec![
                candidate("380 V", Some(DocumentKind::Manual), Some(Confidence::High)),
                candidate("220 V", Some(DocumentKind::Passport), Some(Confidence::Medium)),
                candidate("400 V", Some(DocumentKind::Drawing), Some(Confidence::High)),
            ],
        )
        .unwrap();

        assert_eq!(chosen.status, ValueStatus::Conflict);
        assert_eq!(chosen.value, "220 V"); // passport outranks everything
        assert_eq!(chosen.conflicts.len(), 3);
        assert_eq!(chosen.conflicts.iter().filter(|e| e.selected).count(), 1);
        let selected = chosen.conflicts.iter().find(|e| e.selected).unwrap();
        assert_eq!(selected.value, "220 V");
        assert!(chosen.note.starts_with("CONFLICT: "));
        assert!(chosen.note.contains("380 V"));
        assert!(chosen.note.contains("manual.pdf"));
    }

    #[test]
    fn source_priority_dominates_confidence() {
        // The documented case: Passport/low beats Drawing/high, because
        // (0, 2) < (3, 0) on the ascending key.
        let chosen = resolve(
            FieldId::B3Weight,
            vec![
                candidate("A", Some(DocumentKind::Passport), Some(Confidence::Low)),
                candidate("B", Some(DocumentKind::Drawing), Some(Confidence::High)),
            ],
        )
        .unwrap();
        assert_eq!(chosen.value, "A");
    }

    #[test]
    fn confidence_breaks_equal_priority() {
        let chosen = resolve(
            FieldId::B3Weight,
            vec![
                candidate("A", Some(DocumentKind::Catalog), Some(Confidence::Low)),
                candidate("B", Some(DocumentKind::Catalog), Some(Confidence::High)),
            ],
        )
        .unwrap();
        assert_eq!(chosen.value, "B");
    }

    #[test]
    fn full_tie_goes_to_iteration_order() {
        let chosen = resolve(
            FieldId::B3Weight,
            vec![
                candidate("first", Some(DocumentKind::Manual), Some(Confidence::High)),
                candidate("second", Some(DocumentKind::Manual), Some(Confidence::High)),
            ],
        )
        .unwrap();
        assert_eq!(chosen.value, "first");
    }

    #[test]
    fn unknown_kind_ranks_last() {
        assert_eq!(source_priority(None), UNKNOWN_RANK);
        assert_eq!(confidence_rank(None), UNKNOWN_RANK);

        let chosen = resolve(
            FieldId::B3Weight,
            vec![
                candidate("mystery", None, Some(Confidence::High)),
                candidate("documented", Some(DocumentKind::Document), Some(Confidence::Low)),
            ],
        )
        .unwrap();
        assert_eq!(chosen.value, "documented");
    }

    #[test]
    fn priority_table_matches_policy() {
        assert_eq!(source_priority(Some(DocumentKind::Passport)), 0);
        assert_eq!(source_priority(Some(DocumentKind::Catalog)), 1);
        assert_eq!(source_priority(Some(DocumentKind::Manual)), 2);
        assert_eq!(source_priority(Some(DocumentKind::Drawing)), 3);
        assert_eq!(source_priority(Some(DocumentKind::Document)), 4);
    }

    #[test]
    fn resolve_all_builds_record_and_notes() {
        let mut aggregated: std::collections::BTreeMap<FieldId, Vec<FieldCandidate>> =
            FieldId::ALL.into_iter().map(|f| (f, Vec::new())).collect();
        aggregated.insert(
            FieldId::D2Voltage,
            vec![
                candidate("380 V", Some(DocumentKind::Passport), Some(Confidence::High)),
                candidate("220 V", Some(DocumentKind::Manual), Some(Confidence::High)),
            ],
        );
        aggregated.insert(
            FieldId::D1Power,
            vec![candidate("5 kW", Some(DocumentKind::Manual), Some(Confidence::High))],
        );

        let (record, notes) = resolve_all(aggregated).unwrap();

        assert_eq!(record.present_count(), 2);
        assert_eq!(record.get(FieldId::D2Voltage).unwrap().status, ValueStatus::Conflict);
        assert_eq!(record.get(FieldId::D1Power).unwrap().status, ValueStatus::Ok);
        assert!(record.get(FieldId::A1Name).is_none());

        assert_eq!(notes.len(), 1);
        assert!(notes[0].starts_with("D.2."));
        assert!(notes[0].contains("sources disagree"));
    }

    #[test]
    fn resolve_all_repeated_identical_values_are_not_noted() {
        let mut aggregated: std::collections::BTreeMap<FieldId, Vec<FieldCandidate>> =
            FieldId::ALL.into_iter().map(|f| (f, Vec::new())).collect();
        aggregated.insert(
            FieldId::G3Noise,
            vec![
                candidate("78 dBA", Some(DocumentKind::Manual), Some(Confidence::High)),
                candidate("78 dBA", Some(DocumentKind::Manual), Some(Confidence::Medium)),
            ],
        );

        let (record, notes) = resolve_all(aggregated).unwrap();
        assert_eq!(record.get(FieldId::G3Noise).unwrap().status, ValueStatus::Ok);
        assert!(notes.is_empty());
    }
}
