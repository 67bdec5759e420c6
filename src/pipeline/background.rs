//! Background execution of the pipeline.
//!
//! The pipeline runs on one dedicated thread so the interactive surface
//! stays responsive; progress events arrive over a channel and the final
//! result via `join`. Cancellation is cooperative and the handle cancels
//! and joins on drop, so an abandoned worker never outlives its owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::chunking::ScannedFile;
use super::oracle::ExtractionOracle;
use super::runner::{ExtractionPipeline, PipelineEvent, PipelineReport};
use super::PipelineError;
use crate::config::PipelineConfig;

/// Cooperative cancellation flag, polled between oracle calls and stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The pipeline aborts at its next checkpoint,
    /// discarding in-flight state; nothing is interrupted mid-call.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Handle for a pipeline running on its own thread.
pub struct PipelineWorker {
    cancel: CancelToken,
    events: Receiver<PipelineEvent>,
    handle: Option<JoinHandle<Result<PipelineReport, PipelineError>>>,
}

/// Start the pipeline on a dedicated background thread.
pub fn spawn_pipeline(
    oracle: Box<dyn ExtractionOracle>,
    config: PipelineConfig,
    files: Vec<ScannedFile>,
) -> PipelineWorker {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let (tx, rx) = channel();

    let handle = std::thread::spawn(move || {
        let pipeline = ExtractionPipeline::new(oracle, config);
        let progress = {
            let tx = tx.clone();
            move |event: PipelineEvent| {
                let _ = tx.send(event);
            }
        };

        let result = pipeline.run(&files, &token, Some(&progress));
        if let Err(e) = &result {
            let _ = tx.send(PipelineEvent::Failed {
                error: e.to_string(),
            });
        }
        result
    });

    PipelineWorker {
        cancel,
        events: rx,
        handle: Some(handle),
    }
}

impl PipelineWorker {
    /// Request cooperative cancellation; the run ends at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Progress events, drained by the interactive surface at its own pace.
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    pub fn try_next_event(&self) -> Option<PipelineEvent> {
        self.events.try_recv().ok()
    }

    /// Wait for the run to finish and take its result.
    pub fn join(mut self) -> Result<PipelineReport, PipelineError> {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(PipelineError::ExtractionFailed {
                    detail: "pipeline worker thread panicked".to_string(),
                })
            }),
            None => Err(PipelineError::Cancelled),
        }
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
