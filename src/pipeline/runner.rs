//! Pipeline orchestration: prepare → context → extract → aggregate →
//! verify → validate.
//!
//! Strictly sequential, one oracle call at a time: the oracle account is
//! rate-limited, and fan-out would tangle page remapping and error
//! attribution. Cancellation is cooperative: the token is polled between
//! stages and between oracle calls, never mid-call.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregate::aggregate;
use super::background::CancelToken;
use super::chunking::{build_chunks, ScannedFile};
use super::dedup::{dedupe_overlaps, OcrConfusionTable};
use super::oracle::{parse_partial_record, EquipmentContext, ExtractionOracle, OracleReply};
use super::resolve::resolve_all;
use super::types::{Chunk, ChunkMeta, PartialRecord};
use super::validate::{validate, CompletenessReport};
use super::verify::{apply_verification, verification_summary, VerificationPayload};
use super::PipelineError;
use crate::config::PipelineConfig;

// ═══════════════════════════════════════════
// Stages and progress events
// ═══════════════════════════════════════════

/// The six pipeline stages, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Prepare,
    Context,
    Extract,
    Aggregate,
    Verify,
    Validate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Context => "context",
            Self::Extract => "extract",
            Self::Aggregate => "aggregate",
            Self::Verify => "verify",
            Self::Validate => "validate",
        }
    }

    /// 1-based position for "stage 3/6" progress displays.
    pub fn number(&self) -> u32 {
        match self {
            Self::Prepare => 1,
            Self::Context => 2,
            Self::Extract => 3,
            Self::Aggregate => 4,
            Self::Verify => 5,
            Self::Validate => 6,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event emitted as the pipeline advances, consumed asynchronously by the
/// interactive surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    Started {
        files: u32,
    },
    StageStarted {
        stage: Stage,
    },
    ContextResolved {
        summary: String,
    },
    ChunkProgress {
        completed: u32,
        total: u32,
        file: String,
        pages: String,
    },
    ChunkSkipped {
        file: String,
        pages: String,
        error: String,
    },
    Completed {
        present: u32,
        missing: u32,
        warnings: u32,
        duration_ms: u64,
    },
    Failed {
        error: String,
    },
}

// ═══════════════════════════════════════════
// Report
// ═══════════════════════════════════════════

/// Final output handed to rendering: the reconciled record, the ordered
/// notes, the completeness classification and run bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub finished_at: DateTime<Utc>,
    pub record: super::types::ResolvedRecord,
    pub notes: Vec<String>,
    pub completeness: CompletenessReport,
    pub chunks_total: u32,
    pub chunks_extracted: u32,
    /// Per-chunk failures that did not abort the run.
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

// ═══════════════════════════════════════════
// The pipeline
// ═══════════════════════════════════════════

enum CallOutcome {
    Value(serde_json::Value),
    Skipped(String),
}

/// Drives the full extraction run against one oracle.
pub struct ExtractionPipeline {
    oracle: Box<dyn ExtractionOracle>,
    config: PipelineConfig,
    ocr_table: OcrConfusionTable,
}

impl ExtractionPipeline {
    pub fn new(oracle: Box<dyn ExtractionOracle>, config: PipelineConfig) -> Self {
        Self {
            oracle,
            config,
            ocr_table: OcrConfusionTable::default(),
        }
    }

    pub fn with_ocr_table(mut self, table: OcrConfusionTable) -> Self {
        self.ocr_table = table;
        self
    }

    /// Run the pipeline to completion (or cancellation) on the calling
    /// thread. Use [`super::background::spawn_pipeline`] to keep it off the
    /// interactive surface.
    pub fn run(
        &self,
        files: &[ScannedFile],
        cancel: &CancelToken,
        progress: Option<&dyn Fn(PipelineEvent)>,
    ) -> Result<PipelineReport, PipelineError> {
        self.config.validate().map_err(PipelineError::Config)?;
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        emit(progress, PipelineEvent::Started { files: files.len() as u32 });

        // Stage 1: chunk preparation
        self.enter_stage(Stage::Prepare, cancel, progress)?;
        let chunks = build_chunks(files, &self.config)?;
        if chunks.is_empty() {
            return Err(PipelineError::NoChunks);
        }
        tracing::info!(
            run_id = %run_id,
            files = files.len(),
            chunks = chunks.len(),
            chunk_size = self.config.chunk_size,
            overlap = self.config.overlap,
            "Prepared extraction chunks"
        );

        // Stage 2: equipment context
        self.enter_stage(Stage::Context, cancel, progress)?;
        let context = self.determine_context(&chunks, cancel, progress)?;

        // Stage 3: per-chunk extraction, one oracle call at a time
        self.enter_stage(Stage::Extract, cancel, progress)?;
        let mut extractions: Vec<(ChunkMeta, PartialRecord)> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut last_failure = String::new();
        let total = chunks.len() as u32;

        for (i, chunk) in chunks.iter().enumerate() {
            emit(
                progress,
                PipelineEvent::ChunkProgress {
                    completed: i as u32,
                    total,
                    file: chunk.source_file.clone(),
                    pages: chunk.page_range_display(),
                },
            );

            let outcome =
                self.call_with_retry("extract", cancel, || self.oracle.extract(chunk, &context))?;
            match outcome {
                CallOutcome::Value(raw) => match parse_partial_record(&raw) {
                    Ok(record) => {
                        tracing::info!(
                            file = %chunk.source_file,
                            pages = %chunk.page_range_display(),
                            fields = record.len(),
                            "Chunk extracted"
                        );
                        extractions.push((chunk.meta(), record));
                    }
                    Err(e) => {
                        last_failure = e.to_string();
                        self.skip_chunk(chunk, &last_failure, &mut errors, progress);
                    }
                },
                CallOutcome::Skipped(detail) => {
                    last_failure = detail;
                    self.skip_chunk(chunk, &last_failure, &mut errors, progress);
                }
            }
        }

        // Total failure is terminal, no partial output.
        if extractions.is_empty() {
            let detail = if last_failure.is_empty() {
                "no chunks produced data".to_string()
            } else {
                last_failure
            };
            return Err(PipelineError::ExtractionFailed { detail });
        }

        // Stage 4: aggregate, dedupe overlaps, resolve conflicts
        self.enter_stage(Stage::Aggregate, cancel, progress)?;
        let mut aggregated = aggregate(&extractions);
        for candidates in aggregated.values_mut() {
            let taken = std::mem::take(candidates);
            *candidates = dedupe_overlaps(taken, self.config.overlap, &self.ocr_table);
        }
        let (mut record, mut notes) = resolve_all(aggregated)?;
        let interim = validate(&record);
        tracing::info!(
            present = interim.present.len(),
            missing = interim.missing.len(),
            warnings = interim.warnings.len(),
            "Aggregation complete"
        );

        // Stage 5: whole-document verification (non-fatal on failure)
        self.enter_stage(Stage::Verify, cancel, progress)?;
        let summary = verification_summary(&record);
        let outcome = self.call_with_retry("verify", cancel, || {
            self.oracle.verify(&summary, &chunks, &context)
        })?;
        match outcome {
            CallOutcome::Value(raw) => match VerificationPayload::from_value(raw) {
                Some(payload) => {
                    let extra = apply_verification(&mut record, Some(&payload));
                    tracing::info!(notes = extra.len(), "Verification pass merged");
                    notes.extend(extra);
                }
                None => {
                    tracing::warn!("Verification reply unusable, continuing without it");
                }
            },
            CallOutcome::Skipped(detail) => {
                tracing::warn!(error = %detail, "Verification failed, continuing without it");
            }
        }

        // Stage 6: completeness
        self.enter_stage(Stage::Validate, cancel, progress)?;
        let completeness = validate(&record);

        let report = PipelineReport {
            run_id,
            finished_at: Utc::now(),
            chunks_extracted: extractions.len() as u32,
            chunks_total: total,
            record,
            notes,
            errors,
            duration_ms: started.elapsed().as_millis() as u64,
            completeness,
        };
        emit(
            progress,
            PipelineEvent::Completed {
                present: report.completeness.present.len() as u32,
                missing: report.completeness.missing.len() as u32,
                warnings: report.completeness.warnings.len() as u32,
                duration_ms: report.duration_ms,
            },
        );
        Ok(report)
    }

    fn enter_stage(
        &self,
        stage: Stage,
        cancel: &CancelToken,
        progress: Option<&dyn Fn(PipelineEvent)>,
    ) -> Result<(), PipelineError> {
        self.checkpoint(cancel)?;
        tracing::info!(stage = %stage, number = stage.number(), "Pipeline stage starting");
        emit(progress, PipelineEvent::StageStarted { stage });
        Ok(())
    }

    fn checkpoint(&self, cancel: &CancelToken) -> Result<(), PipelineError> {
        if cancel.is_cancelled() {
            tracing::info!("Pipeline cancelled, discarding in-flight state");
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    fn skip_chunk(
        &self,
        chunk: &Chunk,
        detail: &str,
        errors: &mut Vec<String>,
        progress: Option<&dyn Fn(PipelineEvent)>,
    ) {
        tracing::warn!(
            file = %chunk.source_file,
            pages = %chunk.page_range_display(),
            error = %detail,
            "Chunk skipped"
        );
        errors.push(format!(
            "{} ({}): {detail}",
            chunk.source_file,
            chunk.page_range_display()
        ));
        emit(
            progress,
            PipelineEvent::ChunkSkipped {
                file: chunk.source_file.clone(),
                pages: chunk.page_range_display(),
                error: detail.to_string(),
            },
        );
    }

    /// Determine the shared equipment context from the first chunk of each
    /// file. Failure here is not fatal; extraction just runs without the
    /// context block.
    fn determine_context(
        &self,
        chunks: &[Chunk],
        cancel: &CancelToken,
        progress: Option<&dyn Fn(PipelineEvent)>,
    ) -> Result<EquipmentContext, PipelineError> {
        let first = first_chunk_per_file(chunks);
        let outcome = self.call_with_retry("determine_context", cancel, || {
            self.oracle.determine_context(&first)
        })?;
        match outcome {
            CallOutcome::Value(raw) => match EquipmentContext::from_value(raw) {
                Some(context) if !context.is_empty() => {
                    tracing::info!(context = %context.prompt_block(), "Equipment context determined");
                    emit(
                        progress,
                        PipelineEvent::ContextResolved {
                            summary: context.prompt_block(),
                        },
                    );
                    Ok(context)
                }
                _ => {
                    tracing::warn!("Equipment context unusable, continuing without it");
                    Ok(EquipmentContext::default())
                }
            },
            CallOutcome::Skipped(detail) => {
                tracing::warn!(error = %detail, "Equipment context failed, continuing without it");
                Ok(EquipmentContext::default())
            }
        }
    }

    /// One oracle call with bounded exponential backoff on transient
    /// failures. Permanent and malformed replies short-circuit; exhausted
    /// retries surface as a skip, never as a run abort.
    fn call_with_retry(
        &self,
        what: &str,
        cancel: &CancelToken,
        mut call: impl FnMut() -> OracleReply<serde_json::Value>,
    ) -> Result<CallOutcome, PipelineError> {
        let mut last_failure = String::new();

        for attempt in 0..self.config.max_oracle_attempts {
            self.checkpoint(cancel)?;
            match call() {
                OracleReply::Success(value) => return Ok(CallOutcome::Value(value)),
                OracleReply::Permanent(detail) => {
                    tracing::error!(
                        call = what,
                        error = %detail,
                        "Permanent oracle failure, not retrying"
                    );
                    return Ok(CallOutcome::Skipped(detail));
                }
                OracleReply::Malformed(detail) => {
                    tracing::error!(call = what, error = %detail, "Malformed oracle reply");
                    return Ok(CallOutcome::Skipped(detail));
                }
                OracleReply::Transient(detail) => {
                    last_failure = detail;
                    if attempt + 1 < self.config.max_oracle_attempts {
                        let delay = Duration::from_millis(
                            self.config
                                .retry_base_delay_ms
                                .saturating_mul(1 << attempt.min(16)),
                        );
                        tracing::warn!(
                            call = what,
                            attempt = attempt + 1,
                            attempts = self.config.max_oracle_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %last_failure,
                            "Transient oracle failure, retrying"
                        );
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        tracing::error!(call = what, error = %last_failure, "Oracle attempts exhausted");
        Ok(CallOutcome::Skipped(last_failure))
    }
}

fn emit(progress: Option<&dyn Fn(PipelineEvent)>, event: PipelineEvent) {
    if let Some(progress) = progress {
        progress(event);
    }
}

/// First chunk of each distinct file, in input order.
fn first_chunk_per_file(chunks: &[Chunk]) -> Vec<Chunk> {
    let mut seen = std::collections::BTreeSet::new();
    chunks
        .iter()
        .filter(|c| seen.insert(c.source_file.clone()))
        .cloned()
        .collect()
}
