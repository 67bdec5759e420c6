//! Core types for the extraction and reconciliation pipeline.
//!
//! These types model the full lifecycle:
//! Files → Chunks → Oracle candidates → Aggregation → Resolution → Card.
//!
//! Everything the oracle produces is deserialized tolerantly: null string
//! fields become empty strings, pages accept numbers or numeric strings,
//! and unknown enum spellings degrade to "unknown" instead of failing the
//! whole reply.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::checklist::FieldId;

// ═══════════════════════════════════════════
// Document kind
// ═══════════════════════════════════════════

/// Document classification driving source priority during conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Passport,
    Manual,
    Drawing,
    Catalog,
    Document,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::Manual => "manual",
            Self::Drawing => "drawing",
            Self::Catalog => "catalog",
            Self::Document => "document",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passport" => Some(Self::Passport),
            "manual" => Some(Self::Manual),
            "drawing" => Some(Self::Drawing),
            "catalog" => Some(Self::Catalog),
            "document" => Some(Self::Document),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Confidence
// ═══════════════════════════════════════════

/// Oracle confidence in one extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Value status
// ═══════════════════════════════════════════

/// Status of a reconciled field value.
///
/// Field-level ambiguity is never an error; it lives here as data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueStatus {
    #[default]
    Ok,
    NoData,
    NotApplicable,
    Reference,
    Conflict,
    Ambiguous,
    /// Derived indirectly by the verification pass, never read off a page.
    Inferred,
}

impl ValueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NoData => "no_data",
            Self::NotApplicable => "not_applicable",
            Self::Reference => "reference",
            Self::Conflict => "conflict",
            Self::Ambiguous => "ambiguous",
            Self::Inferred => "inferred",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "ok" => Some(Self::Ok),
            "no_data" | "no data" => Some(Self::NoData),
            "not_applicable" | "not applicable" => Some(Self::NotApplicable),
            "reference" => Some(Self::Reference),
            "conflict" => Some(Self::Conflict),
            "ambiguous" => Some(Self::Ambiguous),
            "inferred" => Some(Self::Inferred),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Tolerant deserializers
// ═══════════════════════════════════════════

/// Oracles return null where the contract says string; fold to "".
pub(crate) fn de_null_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Page numbers arrive as integers, numeric strings ("p. 5" excluded), or null.
pub(crate) fn de_flexible_page<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().map(|n| n as u32),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

/// Unknown document-kind spellings degrade to None (priority "unknown").
fn de_opt_kind<'de, D>(deserializer: D) -> Result<Option<DocumentKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(DocumentKind::from_str))
}

/// Unknown confidence spellings degrade to None (rank "unknown").
fn de_opt_confidence<'de, D>(deserializer: D) -> Result<Option<Confidence>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(Confidence::from_str))
}

/// Unknown status markers degrade to Ok; the note still carries the raw text
/// the oracle attached, so nothing is lost.
fn de_status<'de, D>(deserializer: D) -> Result<ValueStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .as_deref()
        .and_then(ValueStatus::from_str)
        .unwrap_or_default())
}

// ═══════════════════════════════════════════
// Source reference
// ═══════════════════════════════════════════

/// Where a candidate value came from.
///
/// `page` is document-global after aggregation; before that it is local to
/// the chunk the oracle saw.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default, deserialize_with = "de_null_string")]
    pub file: String,
    #[serde(default, rename = "doc_type", deserialize_with = "de_opt_kind")]
    pub kind: Option<DocumentKind>,
    #[serde(default, deserialize_with = "de_flexible_page")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "de_null_string")]
    pub section: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub quote: String,
    #[serde(default, deserialize_with = "de_opt_confidence")]
    pub confidence: Option<Confidence>,
}

impl SourceRef {
    /// Human-readable source coordinates for notes and logs.
    pub fn display(&self) -> String {
        let mut parts = vec![self.file.clone()];
        if let Some(kind) = self.kind {
            parts.push(kind.to_string());
        }
        if let Some(page) = self.page {
            parts.push(format!("p. {page}"));
        }
        parts.retain(|p| !p.is_empty());
        parts.join(", ")
    }
}

// ═══════════════════════════════════════════
// Candidates and conflicts
// ═══════════════════════════════════════════

/// One of several conflicting positions, preserved for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictEntry {
    #[serde(default, deserialize_with = "de_null_string")]
    pub value: String,
    #[serde(default)]
    pub source: SourceRef,
    /// Chosen as the authoritative value by the priority ranking.
    #[serde(default, rename = "is_selected")]
    pub selected: bool,
}

/// One oracle-produced value for one checklist field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCandidate {
    #[serde(default, deserialize_with = "de_null_string")]
    pub value: String,
    #[serde(default)]
    pub source: SourceRef,
    #[serde(default, deserialize_with = "de_status")]
    pub status: ValueStatus,
    #[serde(default, deserialize_with = "de_null_string")]
    pub note: String,
    /// Populated only when `status == Conflict`.
    #[serde(default, rename = "conflict_values")]
    pub conflicts: Vec<ConflictEntry>,
}

impl FieldCandidate {
    pub fn new(value: impl Into<String>, source: SourceRef) -> Self {
        Self {
            value: value.into(),
            source,
            status: ValueStatus::Ok,
            note: String::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn trimmed_value(&self) -> &str {
        self.value.trim()
    }

    /// Append to the note, "; "-separated like the audit trail expects.
    pub fn push_note(&mut self, note: &str) {
        if self.note.is_empty() {
            self.note = note.to_string();
        } else {
            self.note.push_str("; ");
            self.note.push_str(note);
        }
    }
}

/// Fields recognized in a single oracle reply for a single chunk.
pub type PartialRecord = BTreeMap<FieldId, FieldCandidate>;

// ═══════════════════════════════════════════
// Resolved record
// ═══════════════════════════════════════════

/// The authoritative one-candidate-per-field result of reconciliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedRecord {
    fields: BTreeMap<FieldId, FieldCandidate>,
}

impl ResolvedRecord {
    pub fn get(&self, field: FieldId) -> Option<&FieldCandidate> {
        self.fields.get(&field)
    }

    pub fn get_mut(&mut self, field: FieldId) -> Option<&mut FieldCandidate> {
        self.fields.get_mut(&field)
    }

    pub fn insert(&mut self, field: FieldId, candidate: FieldCandidate) {
        self.fields.insert(field, candidate);
    }

    pub fn is_present(&self, field: FieldId) -> bool {
        self.fields.contains_key(&field)
    }

    /// Number of fields holding a value.
    pub fn present_count(&self) -> usize {
        self.fields.len()
    }

    /// Walk the full checklist in order, absent fields included.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, Option<&FieldCandidate>)> {
        FieldId::ALL
            .into_iter()
            .map(move |f| (f, self.fields.get(&f)))
    }
}

// ═══════════════════════════════════════════
// Chunks
// ═══════════════════════════════════════════

/// Source format categories assigned by the external scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Page-addressable binary (PDF).
    PagedBinary,
    RasterImage,
    OfficeDocument,
    /// Plain or delimited text.
    PlainText,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PagedBinary => "paged_binary",
            Self::RasterImage => "raster_image",
            Self::OfficeDocument => "office_document",
            Self::PlainText => "plain_text",
        }
    }
}

/// Chunk payload: re-encoded binary for page windows and whole binary files,
/// decoded text for text files.
#[derive(Debug, Clone)]
pub enum ChunkPayload {
    Binary(Vec<u8>),
    Text(String),
}

impl ChunkPayload {
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(b) => b.len(),
            Self::Text(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One bounded unit of content sent to the extraction oracle.
///
/// Invariant: `page_start` and `page_end` are both set (1-based, inclusive,
/// start ≤ end) or both absent.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub source_file: String,
    pub kind: DocumentKind,
    pub format: SourceFormat,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
    pub payload: ChunkPayload,
    pub media_type: String,
    pub total_pages: Option<u32>,
}

impl Chunk {
    pub fn page_range_display(&self) -> String {
        match (self.page_start, self.page_end) {
            (Some(start), Some(end)) if start == end => format!("p. {start}"),
            (Some(start), Some(end)) => format!("pp. {start}-{end}"),
            _ => "whole file".to_string(),
        }
    }

    pub fn source_display(&self) -> String {
        format!("{} ({})", self.source_file, self.kind)
    }

    /// Provenance that outlives the payload.
    pub fn meta(&self) -> ChunkMeta {
        ChunkMeta {
            source_file: self.source_file.clone(),
            kind: self.kind,
            page_start: self.page_start,
            page_end: self.page_end,
        }
    }
}

/// The provenance subset of a chunk, kept after the payload is consumed.
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    pub source_file: String,
    pub kind: DocumentKind,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_kind_roundtrip() {
        for kind in [
            DocumentKind::Passport,
            DocumentKind::Manual,
            DocumentKind::Drawing,
            DocumentKind::Catalog,
            DocumentKind::Document,
        ] {
            assert_eq!(DocumentKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(DocumentKind::from_str("PASSPORT"), Some(DocumentKind::Passport));
        assert_eq!(DocumentKind::from_str("datasheet"), None);
    }

    #[test]
    fn confidence_roundtrip() {
        for conf in [Confidence::High, Confidence::Medium, Confidence::Low] {
            assert_eq!(Confidence::from_str(conf.as_str()), Some(conf));
        }
        assert_eq!(Confidence::from_str("certain"), None);
    }

    #[test]
    fn value_status_default_is_ok() {
        assert_eq!(ValueStatus::default(), ValueStatus::Ok);
        assert_eq!(ValueStatus::from_str(""), Some(ValueStatus::Ok));
        assert_eq!(ValueStatus::from_str("no data"), Some(ValueStatus::NoData));
    }

    #[test]
    fn source_ref_tolerates_nulls() {
        let json = r#"{"file": null, "doc_type": null, "page": null, "section": null, "quote": null, "confidence": null}"#;
        let source: SourceRef = serde_json::from_str(json).unwrap();
        assert_eq!(source.file, "");
        assert_eq!(source.kind, None);
        assert_eq!(source.page, None);
        assert_eq!(source.confidence, None);
    }

    #[test]
    fn source_ref_tolerates_unknown_spellings() {
        let json = r#"{"file": "a.pdf", "doc_type": "datasheet", "confidence": "certain"}"#;
        let source: SourceRef = serde_json::from_str(json).unwrap();
        assert_eq!(source.kind, None);
        assert_eq!(source.confidence, None);
    }

    #[test]
    fn page_accepts_numeric_string() {
        let source: SourceRef = serde_json::from_str(r#"{"page": "12"}"#).unwrap();
        assert_eq!(source.page, Some(12));
        let source: SourceRef = serde_json::from_str(r#"{"page": 7}"#).unwrap();
        assert_eq!(source.page, Some(7));
        let source: SourceRef = serde_json::from_str(r#"{"page": "p. 7"}"#).unwrap();
        assert_eq!(source.page, None);
    }

    #[test]
    fn source_display_skips_unknown_parts() {
        let source = SourceRef {
            file: "passport.pdf".into(),
            kind: Some(DocumentKind::Passport),
            page: Some(7),
            ..SourceRef::default()
        };
        assert_eq!(source.display(), "passport.pdf, passport, p. 7");

        let bare = SourceRef {
            file: "notes.txt".into(),
            ..SourceRef::default()
        };
        assert_eq!(bare.display(), "notes.txt");
    }

    #[test]
    fn candidate_deserializes_from_minimal_reply() {
        let json = r#"{"value": "380 V", "source": {"file": "x.pdf", "confidence": "high"}}"#;
        let candidate: FieldCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.value, "380 V");
        assert_eq!(candidate.status, ValueStatus::Ok);
        assert_eq!(candidate.source.confidence, Some(Confidence::High));
        assert!(candidate.conflicts.is_empty());
    }

    #[test]
    fn candidate_unknown_status_degrades_to_ok() {
        let json = r#"{"value": "x", "status": "provisional"}"#;
        let candidate: FieldCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.status, ValueStatus::Ok);
    }

    #[test]
    fn push_note_uses_semicolon_separator() {
        let mut candidate = FieldCandidate::new("5 kW", SourceRef::default());
        candidate.push_note("first");
        candidate.push_note("second");
        assert_eq!(candidate.note, "first; second");
    }

    #[test]
    fn resolved_record_iterates_checklist_order() {
        let mut record = ResolvedRecord::default();
        record.insert(
            FieldId::D2Voltage,
            FieldCandidate::new("380 V", SourceRef::default()),
        );
        let items: Vec<_> = record.iter().collect();
        assert_eq!(items.len(), 44);
        assert_eq!(items[0].0, FieldId::A1Name);
        assert!(items[0].1.is_none());
        let (_, voltage) = items
            .iter()
            .find(|(f, _)| *f == FieldId::D2Voltage)
            .unwrap();
        assert_eq!(voltage.unwrap().value, "380 V");
    }

    #[test]
    fn resolved_record_serde_uses_field_identifiers() {
        let mut record = ResolvedRecord::default();
        record.insert(
            FieldId::A1Name,
            FieldCandidate::new("Lathe", SourceRef::default()),
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"a1_name\""));
        let parsed: ResolvedRecord = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_present(FieldId::A1Name));
    }

    #[test]
    fn chunk_page_range_display() {
        let chunk = Chunk {
            source_file: "pump_passport.pdf".into(),
            kind: DocumentKind::Passport,
            format: SourceFormat::PagedBinary,
            page_start: Some(1),
            page_end: Some(7),
            payload: ChunkPayload::Binary(vec![0u8; 4]),
            media_type: "application/pdf".into(),
            total_pages: Some(17),
        };
        assert_eq!(chunk.page_range_display(), "pp. 1-7");
        assert_eq!(chunk.source_display(), "pump_passport.pdf (passport)");

        let whole = Chunk {
            page_start: None,
            page_end: None,
            ..chunk.clone()
        };
        assert_eq!(whole.page_range_display(), "whole file");

        let single = Chunk {
            page_start: Some(3),
            page_end: Some(3),
            ..chunk
        };
        assert_eq!(single.page_range_display(), "p. 3");
    }

    #[test]
    fn chunk_meta_keeps_provenance() {
        let chunk = Chunk {
            source_file: "m.pdf".into(),
            kind: DocumentKind::Manual,
            format: SourceFormat::PagedBinary,
            page_start: Some(6),
            page_end: Some(12),
            payload: ChunkPayload::Binary(vec![1, 2, 3]),
            media_type: "application/pdf".into(),
            total_pages: Some(17),
        };
        let meta = chunk.meta();
        assert_eq!(meta.source_file, "m.pdf");
        assert_eq!(meta.kind, DocumentKind::Manual);
        assert_eq!(meta.page_start, Some(6));
    }
}
