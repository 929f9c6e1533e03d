//! Activity segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A time interval during which one source is considered active.
///
/// Produced by consolidation; segments for a single source are
/// non-overlapping and sorted by `start`. Invariant: `end > start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceSegment {
    /// Source/speaker the segment belongs to
    pub source_id: String,

    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,
}

impl SourceSegment {
    /// Create a new segment.
    pub fn new(source_id: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            source_id: source_id.into(),
            start,
            end,
        }
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the segment satisfies `end > start`.
    pub fn is_valid(&self) -> bool {
        self.end > self.start && self.start >= 0.0
    }

    /// Whether a timestamp falls inside `[start, end]`.
    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}
