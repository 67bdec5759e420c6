//! Turns scanned files into uniform extraction chunks.
//!
//! Paged binaries are split into overlapping page windows; everything else
//! becomes a single whole-file chunk. Each chunk carries the document-kind
//! classification derived from the file name.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::{pdf, ChunkError, PageWindows};
use crate::config::PipelineConfig;
use crate::pipeline::types::{Chunk, ChunkPayload, DocumentKind, SourceFormat};

/// A file admitted by the external scanner, pre-classified by format.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub name: String,
    pub format: SourceFormat,
}

impl ScannedFile {
    pub fn new(path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name, format }
    }
}

/// Keyword sets per document kind, checked in priority order.
/// Vendor documentation mixes English and Russian freely, so both are here.
fn kind_patterns() -> &'static [(DocumentKind, Regex)] {
    static PATTERNS: OnceLock<Vec<(DocumentKind, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let sets = [
            (
                DocumentKind::Passport,
                r"passport|паспорт|datasheet|data\s*sheet|спецификация|specification|spec\b",
            ),
            (
                DocumentKind::Manual,
                r"manual|руководство|инструкция|instruction|guide|handbook|эксплуатаци",
            ),
            (
                DocumentKind::Drawing,
                r"drawing|чертёж|чертеж|dwg|layout|план|схема|diagram",
            ),
            (DocumentKind::Catalog, r"catalog|каталог|brochure|брошюра"),
        ];
        sets.into_iter()
            .map(|(kind, pattern)| {
                (kind, Regex::new(&format!("(?i){pattern}")).expect("static pattern"))
            })
            .collect()
    })
}

/// Classify a file's document kind from its name.
///
/// Priority order Passport > Manual > Drawing > Catalog; unmatched raster
/// images are assumed to be drawings, everything else is a generic document.
pub fn classify_document(name: &str, format: SourceFormat) -> DocumentKind {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());

    for (kind, pattern) in kind_patterns() {
        if pattern.is_match(&stem) {
            return *kind;
        }
    }

    if format == SourceFormat::RasterImage {
        DocumentKind::Drawing
    } else {
        DocumentKind::Document
    }
}

/// Best-effort text decoding: BOM-sniffed UTF-16/UTF-8, strict UTF-8, then
/// lossy fallback. Never fails; garbled bytes become replacement chars the
/// oracle can still work around.
fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    {
        let le = bytes.starts_with(&[0xFF, 0xFE]);
        let be = bytes.starts_with(&[0xFE, 0xFF]);
        if le || be {
            let units: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|pair| {
                    if le {
                        u16::from_le_bytes([pair[0], pair[1]])
                    } else {
                        u16::from_be_bytes([pair[0], pair[1]])
                    }
                })
                .collect();
            return char::decode_utf16(units)
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect();
        }
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn media_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Build extraction chunks from the scanned files.
pub fn build_chunks(
    files: &[ScannedFile],
    config: &PipelineConfig,
) -> Result<Vec<Chunk>, ChunkError> {
    let mut chunks = Vec::new();

    for file in files {
        let kind = classify_document(&file.name, file.format);
        let media_type = media_type_for(&file.path);

        match file.format {
            SourceFormat::PagedBinary => {
                let bytes = std::fs::read(&file.path)?;
                let doc = pdf::load(&bytes, &file.name)?;
                let total_pages = pdf::page_count(&doc);
                if total_pages == 0 {
                    return Err(ChunkError::EmptyDocument(file.name.clone()));
                }

                for (start, end) in PageWindows::new(total_pages, config.chunk_size, config.overlap)
                {
                    let payload = pdf::extract_page_range(&doc, start, end, &file.name)?;
                    chunks.push(Chunk {
                        source_file: file.name.clone(),
                        kind,
                        format: file.format,
                        page_start: Some(start),
                        page_end: Some(end),
                        payload: ChunkPayload::Binary(payload),
                        media_type: media_type.clone(),
                        total_pages: Some(total_pages),
                    });
                }
                tracing::debug!(
                    file = %file.name,
                    pages = total_pages,
                    "Split paged document into windows"
                );
            }
            SourceFormat::PlainText => {
                let bytes = std::fs::read(&file.path)?;
                chunks.push(Chunk {
                    source_file: file.name.clone(),
                    kind,
                    format: file.format,
                    page_start: None,
                    page_end: None,
                    payload: ChunkPayload::Text(decode_text(&bytes)),
                    media_type,
                    total_pages: None,
                });
            }
            SourceFormat::RasterImage => {
                let bytes = std::fs::read(&file.path)?;
                chunks.push(Chunk {
                    source_file: file.name.clone(),
                    kind,
                    format: file.format,
                    page_start: Some(1),
                    page_end: Some(1),
                    payload: ChunkPayload::Binary(bytes),
                    media_type,
                    total_pages: None,
                });
            }
            SourceFormat::OfficeDocument => {
                let bytes = std::fs::read(&file.path)?;
                chunks.push(Chunk {
                    source_file: file.name.clone(),
                    kind,
                    format: file.format,
                    page_start: None,
                    page_end: None,
                    payload: ChunkPayload::Binary(bytes),
                    media_type,
                    total_pages: None,
                });
            }
        }
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn passport_keywords_win_over_everything() {
        assert_eq!(
            classify_document("pump_passport.pdf", SourceFormat::PagedBinary),
            DocumentKind::Passport
        );
        assert_eq!(
            classify_document("Compressor-Datasheet-v2.pdf", SourceFormat::PagedBinary),
            DocumentKind::Passport
        );
        // Both passport and manual keywords: passport has priority.
        assert_eq!(
            classify_document("passport_and_manual.pdf", SourceFormat::PagedBinary),
            DocumentKind::Passport
        );
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(
            classify_document("OPERATION_MANUAL.PDF", SourceFormat::PagedBinary),
            DocumentKind::Manual
        );
        assert_eq!(
            classify_document("Каталог_оборудования.pdf", SourceFormat::PagedBinary),
            DocumentKind::Catalog
        );
    }

    #[test]
    fn unmatched_image_defaults_to_drawing() {
        assert_eq!(
            classify_document("IMG_2041.png", SourceFormat::RasterImage),
            DocumentKind::Drawing
        );
    }

    #[test]
    fn unmatched_file_defaults_to_document() {
        assert_eq!(
            classify_document("readme.txt", SourceFormat::PlainText),
            DocumentKind::Document
        );
    }

    #[test]
    fn keyworded_image_keeps_its_kind() {
        assert_eq!(
            classify_document("nameplate_passport.jpg", SourceFormat::RasterImage),
            DocumentKind::Passport
        );
    }

    #[test]
    fn decode_plain_utf8() {
        assert_eq!(decode_text("380 V, 50 Hz".as_bytes()), "380 V, 50 Hz");
    }

    #[test]
    fn decode_utf8_with_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("voltage".as_bytes());
        assert_eq!(decode_text(&bytes), "voltage");
    }

    #[test]
    fn decode_utf16_little_endian() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "5 kW".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&bytes), "5 kW");
    }

    #[test]
    fn decode_utf16_big_endian() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "IP54".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_text(&bytes), "IP54");
    }

    #[test]
    fn decode_invalid_bytes_is_lossy_not_fatal() {
        let decoded = decode_text(&[0x66, 0x6F, 0xFF, 0x6F]);
        assert!(decoded.contains('f'));
        assert!(decoded.contains(char::REPLACEMENT_CHARACTER));
    }

    #[test]
    fn paged_binary_splits_into_windows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mill_passport.pdf");
        let texts: Vec<String> = (1..=17).map(|i| format!("page {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        std::fs::write(&path, crate::pipeline::chunking::pdf::fixtures::make_test_pdf(&refs))
            .unwrap();

        let files = vec![ScannedFile::new(&path, SourceFormat::PagedBinary)];
        let config = PipelineConfig::default();
        let chunks = build_chunks(&files, &config).unwrap();

        assert_eq!(chunks.len(), 3);
        let ranges: Vec<_> = chunks
            .iter()
            .map(|c| (c.page_start.unwrap(), c.page_end.unwrap()))
            .collect();
        assert_eq!(ranges, vec![(1, 7), (6, 12), (11, 17)]);
        for chunk in &chunks {
            assert_eq!(chunk.kind, DocumentKind::Passport);
            assert_eq!(chunk.total_pages, Some(17));
            assert_eq!(chunk.media_type, "application/pdf");
            assert!(!chunk.payload.is_empty());
        }
    }

    #[test]
    fn text_file_becomes_single_unpaged_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("specification.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "param,value").unwrap();
        writeln!(f, "voltage,380 V").unwrap();

        let files = vec![ScannedFile::new(&path, SourceFormat::PlainText)];
        let chunks = build_chunks(&files, &PipelineConfig::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.page_start, None);
        assert_eq!(chunk.page_end, None);
        assert_eq!(chunk.total_pages, None);
        assert_eq!(chunk.kind, DocumentKind::Passport); // "specification"
        match &chunk.payload {
            ChunkPayload::Text(text) => assert!(text.contains("380 V")),
            ChunkPayload::Binary(_) => panic!("expected text payload"),
        }
    }

    #[test]
    fn raster_image_is_page_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nameplate.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        let files = vec![ScannedFile::new(&path, SourceFormat::RasterImage)];
        let chunks = build_chunks(&files, &PipelineConfig::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_start, Some(1));
        assert_eq!(chunks[0].page_end, Some(1));
        assert_eq!(chunks[0].media_type, "image/jpeg");
        assert_eq!(chunks[0].kind, DocumentKind::Drawing);
    }

    #[test]
    fn office_document_is_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installation_guide.docx");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let files = vec![ScannedFile::new(&path, SourceFormat::OfficeDocument)];
        let chunks = build_chunks(&files, &PipelineConfig::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_start, None);
        assert_eq!(chunks[0].kind, DocumentKind::Manual); // "guide"
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let files = vec![ScannedFile::new("/no/such/file.txt", SourceFormat::PlainText)];
        let result = build_chunks(&files, &PipelineConfig::default());
        assert!(matches!(result, Err(ChunkError::Io(_))));
    }

    #[test]
    fn broken_paged_binary_is_a_paged_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt_manual.pdf");
        std::fs::write(&path, b"definitely not a paged document").unwrap();

        let files = vec![ScannedFile::new(&path, SourceFormat::PagedBinary)];
        let result = build_chunks(&files, &PipelineConfig::default());
        assert!(matches!(result, Err(ChunkError::Paged { .. })));
    }
}
