//! Aggregation of per-chunk extractions into per-field candidate lists.
//!
//! Two fixups happen here: chunk-local page numbers become document-global,
//! and the source file/kind reported by the oracle is replaced with the
//! chunk's own metadata. The oracle routinely misattributes both.

use std::collections::BTreeMap;

use crate::checklist::FieldId;
use crate::pipeline::types::{ChunkMeta, FieldCandidate, PartialRecord};

/// Collect candidates for every checklist field across all chunks.
///
/// Every field appears as a key, even with no candidates.
pub fn aggregate(
    extractions: &[(ChunkMeta, PartialRecord)],
) -> BTreeMap<FieldId, Vec<FieldCandidate>> {
    let mut aggregated: BTreeMap<FieldId, Vec<FieldCandidate>> =
        FieldId::ALL.into_iter().map(|f| (f, Vec::new())).collect();

    for (meta, record) in extractions {
        for (field, candidate) in record {
            let mut candidate = candidate.clone();

            // Chunk-local page → document-global page.
            if let (Some(page), Some(start)) = (candidate.source.page, meta.page_start) {
                candidate.source.page = Some(start + page - 1);
            }

            // The chunk knows where it came from; the oracle only guesses.
            candidate.source.file = meta.source_file.clone();
            candidate.source.kind = Some(meta.kind);

            aggregated.entry(*field).or_default().push(candidate);
        }
    }

    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{DocumentKind, SourceRef};

    fn meta(file: &str, kind: DocumentKind, page_start: Option<u32>) -> ChunkMeta {
        ChunkMeta {
            source_file: file.into(),
            kind,
            page_start,
            page_end: page_start.map(|s| s + 6),
        }
    }

    fn candidate(value: &str, page: Option<u32>) -> FieldCandidate {
        FieldCandidate::new(
            value,
            SourceRef {
                page,
                ..SourceRef::default()
            },
        )
    }

    #[test]
    fn every_checklist_field_is_a_key() {
        let aggregated = aggregate(&[]);
        assert_eq!(aggregated.len(), 44);
        assert!(aggregated.values().all(|v| v.is_empty()));
    }

    #[test]
    fn pages_are_remapped_to_document_global() {
        let mut record = PartialRecord::new();
        record.insert(FieldId::D2Voltage, candidate("380 V", Some(2)));

        let aggregated = aggregate(&[(
            meta("m.pdf", DocumentKind::Manual, Some(6)),
            record,
        )]);

        // Local page 2 of a window starting at page 6 → global page 7.
        assert_eq!(aggregated[&FieldId::D2Voltage][0].source.page, Some(7));
    }

    #[test]
    fn first_window_pages_stay_put() {
        let mut record = PartialRecord::new();
        record.insert(FieldId::G3Noise, candidate("78 dBA", Some(4)));

        let aggregated = aggregate(&[(
            meta("p.pdf", DocumentKind::Passport, Some(1)),
            record,
        )]);

        assert_eq!(aggregated[&FieldId::G3Noise][0].source.page, Some(4));
    }

    #[test]
    fn unpaged_chunks_keep_pages_untouched() {
        let mut record = PartialRecord::new();
        record.insert(FieldId::A2Model, candidate("VMC-850B", Some(3)));
        record.insert(FieldId::A1Name, candidate("Machining centre", None));

        let aggregated = aggregate(&[(meta("s.csv", DocumentKind::Document, None), record)]);

        // No window start: page left as reported, None stays None.
        assert_eq!(aggregated[&FieldId::A2Model][0].source.page, Some(3));
        assert_eq!(aggregated[&FieldId::A1Name][0].source.page, None);
    }

    #[test]
    fn oracle_reported_source_is_overwritten() {
        let mut record = PartialRecord::new();
        let mut lying = candidate("5 kW", Some(1));
        lying.source.file = "hallucinated.pdf".into();
        lying.source.kind = Some(DocumentKind::Passport);
        record.insert(FieldId::D1Power, lying);

        let aggregated = aggregate(&[(
            meta("real_manual.pdf", DocumentKind::Manual, Some(1)),
            record,
        )]);

        let source = &aggregated[&FieldId::D1Power][0].source;
        assert_eq!(source.file, "real_manual.pdf");
        assert_eq!(source.kind, Some(DocumentKind::Manual));
    }

    #[test]
    fn candidates_from_all_chunks_accumulate() {
        let mut first = PartialRecord::new();
        first.insert(FieldId::D2Voltage, candidate("380 V", Some(5)));
        let mut second = PartialRecord::new();
        second.insert(FieldId::D2Voltage, candidate("380 V", Some(1)));

        let aggregated = aggregate(&[
            (meta("a.pdf", DocumentKind::Passport, Some(1)), first),
            (meta("a.pdf", DocumentKind::Passport, Some(6)), second),
        ]);

        let candidates = &aggregated[&FieldId::D2Voltage];
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].source.page, Some(5));
        assert_eq!(candidates[1].source.page, Some(6));
    }
}
