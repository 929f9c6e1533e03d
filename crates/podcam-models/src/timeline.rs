//! The final switch timeline.
//!
//! A [`Timeline`] is the gap-free, non-overlapping assignment of a source
//! to every instant of `[0, total_duration)`. It is the artifact handed to
//! the external video-assembly collaborator, which cuts, concatenates and
//! re-encodes the actual media.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::format_seconds;

/// Tolerance for float comparisons on segment boundaries.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// One interval of the final timeline during which a single source is live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineSegment {
    /// Source that is live during this interval
    pub source_id: String,

    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,
}

impl TimelineSegment {
    /// Create a new timeline segment.
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
}

impl std::fmt::Display for TimelineSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {}  {}",
            format_seconds(self.start),
            format_seconds(self.end),
            self.source_id
        )
    }
}

/// The complete switch timeline for one media run.
///
/// Invariants (checked by [`Timeline::validate`]):
/// - segments are sorted by `start`
/// - `segments[i].end == segments[i+1].start` (contiguous, no gaps or overlap)
/// - the first segment starts at 0
/// - the last segment ends at `total_duration`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Timeline {
    /// Ordered, contiguous segments covering the full duration
    pub segments: Vec<TimelineSegment>,

    /// Total duration of the media run in seconds
    pub total_duration: f64,
}

impl Timeline {
    /// Create a timeline after checking the invariants.
    pub fn new(segments: Vec<TimelineSegment>, total_duration: f64) -> Result<Self, TimelineError> {
        let timeline = Self {
            segments,
            total_duration,
        };
        timeline.validate()?;
        Ok(timeline)
    }

    /// Check the timeline invariants.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.total_duration <= 0.0 {
            return Err(TimelineError::InvalidDuration(self.total_duration));
        }
        if self.segments.is_empty() {
            return Err(TimelineError::Empty);
        }

        let first = &self.segments[0];
        if first.start.abs() > BOUNDARY_EPSILON {
            return Err(TimelineError::DoesNotStartAtZero(first.start));
        }

        for (i, segment) in self.segments.iter().enumerate() {
            if segment.end - segment.start <= 0.0 {
                return Err(TimelineError::EmptySegment {
                    index: i,
                    start: segment.start,
                    end: segment.end,
                });
            }
            if let Some(next) = self.segments.get(i + 1) {
                if (next.start - segment.end).abs() > BOUNDARY_EPSILON {
                    return Err(TimelineError::Discontinuity {
                        index: i,
                        end: segment.end,
                        next_start: next.start,
                    });
                }
            }
        }

        let last = self.segments.last().expect("checked non-empty");
        if (last.end - self.total_duration).abs() > BOUNDARY_EPSILON {
            return Err(TimelineError::DoesNotCoverDuration {
                end: last.end,
                total_duration: self.total_duration,
            });
        }

        Ok(())
    }

    /// The source live at a given time, if the time is inside the timeline.
    pub fn source_at(&self, time: f64) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| time >= s.start && time < s.end)
            .map(|s| s.source_id.as_str())
    }

    /// Number of cuts (source changes) in the timeline.
    pub fn cut_count(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    /// Compute summary statistics over the timeline.
    pub fn stats(&self) -> TimelineStats {
        let mut dwell_seconds: HashMap<String, f64> = HashMap::new();
        let mut shortest: f64 = f64::INFINITY;
        let mut longest: f64 = 0.0;

        for segment in &self.segments {
            let duration = segment.duration();
            *dwell_seconds.entry(segment.source_id.clone()).or_insert(0.0) += duration;
            shortest = shortest.min(duration);
            longest = longest.max(duration);
        }

        let segment_count = self.segments.len();
        let average_clip_seconds = if segment_count > 0 {
            self.total_duration / segment_count as f64
        } else {
            0.0
        };

        TimelineStats {
            segment_count,
            cut_count: self.cut_count(),
            dwell_seconds,
            average_clip_seconds,
            shortest_clip_seconds: if segment_count > 0 { shortest } else { 0.0 },
            longest_clip_seconds: longest,
        }
    }
}

/// Summary statistics over a timeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TimelineStats {
    /// Number of segments
    pub segment_count: usize,
    /// Number of cuts (source changes)
    pub cut_count: usize,
    /// Total seconds each source is live
    pub dwell_seconds: HashMap<String, f64>,
    /// Average segment duration in seconds
    pub average_clip_seconds: f64,
    /// Shortest segment duration in seconds
    pub shortest_clip_seconds: f64,
    /// Longest segment duration in seconds
    pub longest_clip_seconds: f64,
}

/// Timeline invariant violation.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// Timeline has no segments
    Empty,
    /// Total duration is not positive
    InvalidDuration(f64),
    /// First segment does not start at 0
    DoesNotStartAtZero(f64),
    /// A segment has `end <= start`
    EmptySegment { index: usize, start: f64, end: f64 },
    /// Adjacent segments do not share a boundary
    Discontinuity {
        index: usize,
        end: f64,
        next_start: f64,
    },
    /// Last segment does not end at the total duration
    DoesNotCoverDuration { end: f64, total_duration: f64 },
}

impl std::fmt::Display for TimelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Timeline has no segments"),
            Self::InvalidDuration(d) => {
                write!(f, "Total duration must be positive, got {:.3}s", d)
            }
            Self::DoesNotStartAtZero(start) => {
                write!(f, "First segment starts at {:.3}s instead of 0", start)
            }
            Self::EmptySegment { index, start, end } => write!(
                f,
                "Segment {} is empty or inverted ({:.3}s -> {:.3}s)",
                index, start, end
            ),
            Self::Discontinuity {
                index,
                end,
                next_start,
            } => write!(
                f,
                "Gap or overlap after segment {}: ends at {:.3}s, next starts at {:.3}s",
                index, end, next_start
            ),
            Self::DoesNotCoverDuration {
                end,
                total_duration,
            } => write!(
                f,
                "Last segment ends at {:.3}s but total duration is {:.3}s",
                end, total_duration
            ),
        }
    }
}

impl std::error::Error for TimelineError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn contiguous_timeline() -> Timeline {
        Timeline::new(
            vec![
                TimelineSegment::new("left", 0.0, 2.0),
                TimelineSegment::new("right", 2.0, 4.0),
                TimelineSegment::new("left", 4.0, 6.0),
            ],
            6.0,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_timeline() {
        let timeline = contiguous_timeline();
        assert!(timeline.validate().is_ok());
        assert_eq!(timeline.cut_count(), 2);
    }

    #[test]
    fn test_gap_rejected() {
        let result = Timeline::new(
            vec![
                TimelineSegment::new("left", 0.0, 2.0),
                TimelineSegment::new("right", 2.5, 6.0),
            ],
            6.0,
        );
        assert!(matches!(result, Err(TimelineError::Discontinuity { .. })));
    }

    #[test]
    fn test_nonzero_start_rejected() {
        let result = Timeline::new(vec![TimelineSegment::new("left", 1.0, 6.0)], 6.0);
        assert!(matches!(result, Err(TimelineError::DoesNotStartAtZero(_))));
    }

    #[test]
    fn test_short_coverage_rejected() {
        let result = Timeline::new(vec![TimelineSegment::new("left", 0.0, 5.0)], 6.0);
        assert!(matches!(
            result,
            Err(TimelineError::DoesNotCoverDuration { .. })
        ));
    }

    #[test]
    fn test_source_at() {
        let timeline = contiguous_timeline();
        assert_eq!(timeline.source_at(0.0), Some("left"));
        assert_eq!(timeline.source_at(2.0), Some("right"));
        assert_eq!(timeline.source_at(5.9), Some("left"));
        assert_eq!(timeline.source_at(6.0), None);
    }

    #[test]
    fn test_stats() {
        let timeline = contiguous_timeline();
        let stats = timeline.stats();
        assert_eq!(stats.segment_count, 3);
        assert_eq!(stats.cut_count, 2);
        assert!((stats.dwell_seconds["left"] - 4.0).abs() < 1e-9);
        assert!((stats.dwell_seconds["right"] - 2.0).abs() < 1e-9);
        assert!((stats.average_clip_seconds - 2.0).abs() < 1e-9);
    }
}
