pub mod aggregate;
pub mod background;
pub mod chunking;
pub mod dedup;
pub mod oracle;
pub mod resolve;
pub mod runner;
pub mod types;
pub mod validate;
pub mod verify;

pub use background::{spawn_pipeline, CancelToken, PipelineWorker};
pub use chunking::{build_chunks, ScannedFile};
pub use dedup::OcrConfusionTable;
pub use oracle::{EquipmentContext, ExtractionOracle, OracleReply};
pub use runner::{ExtractionPipeline, PipelineEvent, PipelineReport, Stage};
pub use types::*;

use thiserror::Error;

use crate::checklist::FieldId;
use chunking::ChunkError;

/// Terminal pipeline failures. Chunk-level problems are not here on purpose:
/// they are skipped, logged and recorded in the report instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Chunk preparation failed: {0}")]
    Chunking(#[from] ChunkError),

    #[error("No chunks could be built from the input files")]
    NoChunks,

    #[error("Extraction produced no usable data: {detail}")]
    ExtractionFailed { detail: String },

    #[error("Cannot resolve an empty candidate list for {0}")]
    EmptyCandidates(FieldId),

    #[error("Pipeline cancelled")]
    Cancelled,
}
