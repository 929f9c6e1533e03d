//! Per-frame observation records.
//!
//! An [`Observation`] is one timestamped reading for one source: a
//! voice-activity flag from a VAD, a face bounding box from a detector, or
//! a "who is speaking" score. Observations arrive dense and noisy in
//! non-decreasing timestamp order; the consolidator turns them into stable
//! segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::rect::NormalizedRect;

/// The measured value of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Observable {
    /// Boolean activity flag (e.g. speech detected)
    Activity(bool),
    /// Detected region in normalized frame coordinates
    Region(NormalizedRect),
    /// Scalar score (e.g. mouth-movement magnitude)
    Score(f64),
}

/// A single timestamped observation for one source.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Observation {
    /// Source that produced the observation (camera/speaker id)
    pub source_id: String,

    /// Timestamp in seconds from the start of the recording
    pub timestamp: f64,

    /// Measured value
    pub value: Observable,
}

impl Observation {
    /// Create a new observation.
    pub fn new(source_id: impl Into<String>, timestamp: f64, value: Observable) -> Self {
        Self {
            source_id: source_id.into(),
            timestamp,
            value,
        }
    }

    /// Convenience constructor for an activity flag.
    pub fn activity(source_id: impl Into<String>, timestamp: f64, active: bool) -> Self {
        Self::new(source_id, timestamp, Observable::Activity(active))
    }

    /// Convenience constructor for a detected region.
    pub fn region(source_id: impl Into<String>, timestamp: f64, rect: NormalizedRect) -> Self {
        Self::new(source_id, timestamp, Observable::Region(rect))
    }

    /// Convenience constructor for a scalar score.
    pub fn score(source_id: impl Into<String>, timestamp: f64, score: f64) -> Self {
        Self::new(source_id, timestamp, Observable::Score(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_serialization() {
        let obs = Observation::region(
            "left",
            1.25,
            NormalizedRect::new(0.2, 0.1, 0.15, 0.2),
        );
        let json = serde_json::to_string(&obs).unwrap();
        assert!(json.contains("\"source_id\":\"left\""));
        assert!(json.contains("region"));

        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source_id, "left");
        assert!(matches!(back.value, Observable::Region(_)));
    }

    #[test]
    fn test_activity_constructor() {
        let obs = Observation::activity("right", 0.5, true);
        assert_eq!(obs.value, Observable::Activity(true));
    }
}
