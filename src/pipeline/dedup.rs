//! Collapsing duplicates born from overlapping page windows.
//!
//! Overlap means the same page is extracted twice, and the oracle is not
//! deterministic: the second pass may return the identical value, an
//! OCR-garbled near-miss, or a genuinely different reading. Exact repeats
//! are dropped, digit-confusion near-misses are folded with an audit note,
//! and everything else is kept for the conflict resolver to arbitrate.

use crate::pipeline::types::{Confidence, FieldCandidate};

/// Digit pairs an OCR layer plausibly swaps.
///
/// A heuristic starting set; callers may substitute their own table.
#[derive(Debug, Clone)]
pub struct OcrConfusionTable {
    pairs: Vec<(char, char)>,
}

impl Default for OcrConfusionTable {
    fn default() -> Self {
        Self {
            pairs: vec![('3', '5'), ('3', '8'), ('5', '8'), ('6', '0'), ('1', '7')],
        }
    }
}

impl OcrConfusionTable {
    pub fn new(pairs: Vec<(char, char)>) -> Self {
        Self { pairs }
    }

    /// Symmetric: (3,5) covers both 3→5 and 5→3.
    pub fn is_confusable(&self, a: char, b: char) -> bool {
        self.pairs
            .iter()
            .any(|&(x, y)| (a, b) == (x, y) || (a, b) == (y, x))
    }
}

/// Two values differ only by OCR-confusable digit substitutions in one or
/// two positions of equal-length strings.
fn are_ocr_variants(a: &str, b: &str, table: &OcrConfusionTable) -> bool {
    let a = a.trim();
    let b = b.trim();
    if a.chars().count() != b.chars().count() {
        return false;
    }
    let mut diffs = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            if !table.is_confusable(ca, cb) {
                return false;
            }
            diffs += 1;
        }
    }
    (1..=2).contains(&diffs)
}

fn confidence_rank(confidence: Option<Confidence>) -> u32 {
    match confidence {
        Some(Confidence::High) => 0,
        Some(Confidence::Medium) => 1,
        Some(Confidence::Low) => 2,
        None => 99,
    }
}

/// Collapse overlap duplicates within one field's candidate list.
///
/// A candidate folds into an already-kept one only when both come from the
/// same file with known pages at most `overlap` apart. Idempotent: running
/// it on its own output changes nothing.
pub fn dedupe_overlaps(
    values: Vec<FieldCandidate>,
    overlap: u32,
    table: &OcrConfusionTable,
) -> Vec<FieldCandidate> {
    if values.len() <= 1 {
        return values;
    }

    let mut kept: Vec<FieldCandidate> = Vec::new();

    'next_value: for value in values {
        for existing in kept.iter_mut() {
            let same_window = existing.source.file == value.source.file
                && !existing.source.file.is_empty()
                && match (existing.source.page, value.source.page) {
                    (Some(a), Some(b)) => a.abs_diff(b) <= overlap,
                    _ => false,
                };
            if !same_window {
                continue;
            }

            // Exact repeat of an overlapped page.
            if existing.trimmed_value() == value.trimmed_value() {
                tracing::debug!(
                    file = %value.source.file,
                    value = %value.value,
                    "Dropped overlap duplicate"
                );
                continue 'next_value;
            }

            // OCR near-miss: keep the better-ranked reading, demote it to
            // low and record what was discarded.
            if are_ocr_variants(&existing.value, &value.value, table) {
                tracing::warn!(
                    file = %value.source.file,
                    kept = %existing.value,
                    discarded = %value.value,
                    "OCR variant in overlap window"
                );
                if confidence_rank(value.source.confidence)
                    < confidence_rank(existing.source.confidence)
                {
                    let mut winner = value;
                    winner.push_note(&format!("OCR variant discarded: {:?}", existing.value));
                    winner.source.confidence = Some(Confidence::Low);
                    *existing = winner;
                } else {
                    let note = format!("OCR variant discarded: {:?}", value.value);
                    existing.push_note(&note);
                    existing.source.confidence = Some(Confidence::Low);
                }
                continue 'next_value;
            }

            // Same window but a genuinely different reading: keep both.
        }
        kept.push(value);
    }

    kept
}
