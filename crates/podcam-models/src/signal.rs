//! Feature signal types.
//!
//! A [`Signal`] is one track's feature series: an audio loudness envelope,
//! a single MFCC coefficient, a per-frame lip-area series. Signals are
//! produced by external feature extractors and are read-only once created.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A sampled 1-D feature series for one track.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Signal {
    /// Human-readable track label (e.g. "left_mic", "main_camera_lips")
    pub label: String,

    /// Samples per second
    pub sample_rate: f64,

    /// Feature values in sample order
    pub values: Vec<f64>,
}

impl Signal {
    /// Create a new signal.
    pub fn new(label: impl Into<String>, sample_rate: f64, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            sample_rate,
            values,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the signal has no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Duration covered by the samples, in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.values.len() as f64 / self.sample_rate
        } else {
            0.0
        }
    }
}

/// Per-source score samples at a fixed step, input to score-driven
/// switching. All tracks handed to the switch builder must share the same
/// sampling step and length.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScoreTrack {
    /// Source this track scores (camera id)
    pub source_id: String,

    /// One score per sampling instant
    pub scores: Vec<f64>,
}

impl ScoreTrack {
    /// Create a new score track.
    pub fn new(source_id: impl Into<String>, scores: Vec<f64>) -> Self {
        Self {
            source_id: source_id.into(),
            scores,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the track has no samples.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
