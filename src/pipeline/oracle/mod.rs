//! The extraction oracle contract.
//!
//! The oracle itself (a remote model endpoint) lives outside this crate;
//! here is the trait the pipeline drives, the tagged reply type callers
//! dispatch on, and the equipment context shared by every call.
//!
//! The tags replace both ad-hoc exception catching and any mutable
//! "last error" field on the client: every call returns its own outcome and
//! failure description, so there is no hidden cross-call state.

pub mod parser;

pub use parser::{parse_partial_record, ParseError};

use serde::{Deserialize, Serialize};

use crate::pipeline::types::Chunk;

// ═══════════════════════════════════════════
// Tagged reply
// ═══════════════════════════════════════════

/// Outcome of a single oracle call.
#[derive(Debug, Clone)]
pub enum OracleReply<T> {
    Success(T),
    /// Response arrived but cannot be used (wrong shape, truncated JSON).
    /// Not retried; the parser may still repair what the extraction layer sees.
    Malformed(String),
    /// Network trouble, rate limiting, empty response. Worth retrying.
    Transient(String),
    /// The payload exceeds what the oracle can accept. Retrying is pointless.
    Permanent(String),
}

impl<T> OracleReply<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure description, if this reply is a failure.
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Malformed(d) | Self::Transient(d) | Self::Permanent(d) => Some(d),
        }
    }
}

// ═══════════════════════════════════════════
// Equipment context
// ═══════════════════════════════════════════

/// What the corpus as a whole describes, determined up front from the first
/// chunk of every file and fed back into each extraction prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquipmentContext {
    #[serde(default)]
    pub equipment_type: Option<String>,
    #[serde(default)]
    pub equipment_name: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default, deserialize_with = "de_string_or_list")]
    pub subsystems: Vec<String>,
    #[serde(default)]
    pub power_class: Option<String>,
    #[serde(default)]
    pub supply_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Oracles return subsystems as a list or one comma-joined string.
fn de_string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(serde_json::Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}

impl EquipmentContext {
    /// Best-effort parse of a raw context reply; None when unusable.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.equipment_type.is_none()
            && self.equipment_name.is_none()
            && self.purpose.is_none()
            && self.subsystems.is_empty()
            && self.power_class.is_none()
            && self.supply_type.is_none()
            && self.notes.is_none()
    }

    /// Render as the plain-text block oracle implementations embed in
    /// prompts, and the runner writes to the log.
    pub fn prompt_block(&self) -> String {
        let mut lines = Vec::new();
        if let Some(t) = &self.equipment_type {
            lines.push(format!("Type: {t}"));
        }
        if let Some(n) = &self.equipment_name {
            lines.push(format!("Name: {n}"));
        }
        if let Some(p) = &self.purpose {
            lines.push(format!("Purpose: {p}"));
        }
        if !self.subsystems.is_empty() {
            lines.push(format!("Subsystems: {}", self.subsystems.join(", ")));
        }
        if let Some(p) = &self.power_class {
            lines.push(format!("Power class: {p}"));
        }
        if let Some(s) = &self.supply_type {
            lines.push(format!("Supply type: {s}"));
        }
        if let Some(n) = &self.notes {
            lines.push(format!("Notes: {n}"));
        }
        lines.join("\n")
    }
}

// ═══════════════════════════════════════════
// The oracle trait
// ═══════════════════════════════════════════

/// External extraction oracle. One call at a time; implementations must be
/// synchronous and must map their transport failures onto the reply tags.
/// Raw replies are JSON values; the pipeline owns parsing and repair.
pub trait ExtractionOracle: Send + Sync {
    /// Determine the shared equipment context from the first chunk of each
    /// file.
    fn determine_context(&self, first_chunks: &[Chunk]) -> OracleReply<serde_json::Value>;

    /// Extract checklist fields from one chunk.
    fn extract(&self, chunk: &Chunk, context: &EquipmentContext) -> OracleReply<serde_json::Value>;

    /// Whole-document verification pass over the resolved summary.
    fn verify(
        &self,
        summary: &serde_json::Value,
        chunks: &[Chunk],
        context: &EquipmentContext,
    ) -> OracleReply<serde_json::Value>;
}
