//! Page counting and page-window re-encoding for paged binary documents.
//!
//! Each window is re-encoded as a standalone document so the oracle only
//! ever sees the pages the window covers.

use lopdf::Document;

use super::ChunkError;

/// Parse a paged binary document from memory.
pub fn load(bytes: &[u8], file: &str) -> Result<Document, ChunkError> {
    Document::load_mem(bytes).map_err(|e| ChunkError::Paged {
        file: file.to_string(),
        detail: e.to_string(),
    })
}

pub fn page_count(doc: &Document) -> u32 {
    doc.get_pages().len() as u32
}

/// Re-encode the inclusive 1-based page range [start, end] as a standalone
/// document.
pub fn extract_page_range(
    doc: &Document,
    start: u32,
    end: u32,
    file: &str,
) -> Result<Vec<u8>, ChunkError> {
    let total = page_count(doc);
    let mut window = doc.clone();

    let outside: Vec<u32> = (1..=total).filter(|p| *p < start || *p > end).collect();
    if !outside.is_empty() {
        window.delete_pages(&outside);
    }
    window.prune_objects();

    let mut buf = Vec::new();
    window.save_to(&mut buf).map_err(|e| ChunkError::Paged {
        file: file.to_string(),
        detail: e.to_string(),
    })?;
    Ok(buf)
}
