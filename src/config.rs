use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Normocard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Smallest accepted page window.
pub const MIN_CHUNK_SIZE: u32 = 3;
/// Largest accepted page window.
pub const MAX_CHUNK_SIZE: u32 = 20;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Tunable parameters for a pipeline run.
///
/// Sourced from external configuration by the embedding application;
/// this crate only validates and consumes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pages per extraction window for paged documents.
    pub chunk_size: u32,
    /// Pages shared between adjacent windows. Must stay below `chunk_size`.
    pub overlap: u32,
    /// Attempt cap for a single oracle call (first try included).
    pub max_oracle_attempts: u32,
    /// Base delay of the exponential backoff between retries, in milliseconds.
    /// Doubles per attempt.
    pub retry_base_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 7,
            overlap: 2,
            max_oracle_attempts: 3,
            retry_base_delay_ms: 5_000,
        }
    }
}

impl PipelineConfig {
    /// Check the configured values against the supported ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size < MIN_CHUNK_SIZE || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(format!(
                "chunk_size {} outside supported range {MIN_CHUNK_SIZE}..={MAX_CHUNK_SIZE}",
                self.chunk_size
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(format!(
                "overlap {} must be smaller than chunk_size {}",
                self.overlap, self.chunk_size
            ));
        }
        if self.max_oracle_attempts == 0 {
            return Err("max_oracle_attempts must be at least 1".into());
        }
        Ok(())
    }
}
