//! Error types for the editing core.
//!
//! Malformed input (empty signal, non-monotonic timestamps, negative
//! durations) is a hard, immediately reported error, never silently
//! corrected: downstream video cutting with bad timestamps silently
//! produces corrupted output.

use thiserror::Error;

use podcam_models::TimelineError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the alignment/consolidation/switching core.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Signal '{label}' is empty")]
    EmptySignal { label: String },

    #[error("Signal '{label}' is flat (zero variance), cannot correlate")]
    DegenerateSignal { label: String },

    #[error("Observations for '{source_id}' go backwards in time ({prev:.3}s -> {next:.3}s)")]
    InvalidObservationOrder {
        source_id: String,
        prev: f64,
        next: f64,
    },

    #[error("Invalid segment for '{source_id}': {start:.3}s -> {end:.3}s")]
    InvalidSegment {
        source_id: String,
        start: f64,
        end: f64,
    },

    #[error("No segments survive filtering and no fallback source is configured")]
    NoViableTimeline,

    #[error("Scoring task failed: {0}")]
    ScoringFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timeline invariant violated: {0}")]
    Timeline(#[from] TimelineError),
}

impl EngineError {
    pub fn empty_signal(label: impl Into<String>) -> Self {
        Self::EmptySignal {
            label: label.into(),
        }
    }

    pub fn degenerate_signal(label: impl Into<String>) -> Self {
        Self::DegenerateSignal {
            label: label.into(),
        }
    }

    pub fn invalid_segment(source_id: impl Into<String>, start: f64, end: f64) -> Self {
        Self::InvalidSegment {
            source_id: source_id.into(),
            start,
            end,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn scoring_failed(msg: impl Into<String>) -> Self {
        Self::ScoringFailed(msg.into())
    }

    /// Whether this error indicates bad upstream data (as opposed to a
    /// misconfiguration of the engine itself).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EngineError::EmptySignal { .. }
                | EngineError::DegenerateSignal { .. }
                | EngineError::InvalidObservationOrder { .. }
                | EngineError::InvalidSegment { .. }
        )
    }
}
