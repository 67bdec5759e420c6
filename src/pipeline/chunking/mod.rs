pub mod builder;
pub mod pdf;
pub mod splitter;

pub use builder::{build_chunks, classify_document, ScannedFile};
pub use splitter::PageWindows;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Paged document error in {file}: {detail}")]
    Paged { file: String, detail: String },

    #[error("Document has no pages: {0}")]
    EmptyDocument(String),
}
