pub mod checklist;
pub mod config;
pub mod pipeline;

pub use checklist::{FieldId, Section};
pub use config::PipelineConfig;
pub use pipeline::PipelineError;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for embedding applications (CLI front ends, tests).
///
/// Honors `RUST_LOG` when set, otherwise falls back to the crate default.
/// Safe to call more than once; subsequent calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
