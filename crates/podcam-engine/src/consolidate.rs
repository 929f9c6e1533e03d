//! Observation consolidation.
//!
//! Converts a dense, noisy observation stream into sparse, stable
//! [`SourceSegment`]s, suppressing short-lived flips and short gaps. The
//! same scan handles voice-activity flags per speaker, per-frame face
//! bounding boxes, and per-frame speaking scores; the caller supplies the
//! similarity function that decides whether a new observation still
//! belongs to the open segment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use podcam_models::{Observable, Observation, SourceSegment};

use crate::error::{EngineError, EngineResult};

/// Thresholds governing consolidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatorConfig {
    /// Similarity at or above this keeps an observation in the open segment
    pub similarity_threshold: f64,

    /// A dissimilar observation arriving within this many seconds of the
    /// open segment's end extends the segment through the gap instead of
    /// closing it. Set to 0.0 to let similarity alone decide (the
    /// region-tracking setting).
    pub min_gap_seconds: f64,

    /// Closing segments shorter than this are dropped; their span merges
    /// into the preceding surviving segment of the same source
    pub min_segment_duration: f64,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
            min_gap_seconds: 1.0,
            min_segment_duration: 1.0,
        }
    }
}

/// Built-in similarity functions.
pub mod similarity {
    use podcam_models::Observable;

    /// Turn-taking similarity: always below threshold, so segment
    /// boundaries are governed purely by the gap rule. Use with dense
    /// activity observations and a positive `min_gap_seconds`.
    pub fn time_adjacency(_a: &Observable, _b: &Observable) -> f64 {
        0.0
    }

    /// Region similarity: IoU of the two bounding boxes. Non-`Region`
    /// operands and degenerate boxes score 0.0.
    pub fn region_iou(a: &Observable, b: &Observable) -> f64 {
        match (a, b) {
            (Observable::Region(x), Observable::Region(y)) => x.iou(y),
            _ => 0.0,
        }
    }
}

/// An in-progress segment for one source.
struct OpenSegment {
    start: f64,
    end: f64,
    /// The value that opened the segment; every later observation is
    /// compared against it, not against the latest one
    representative: Observable,
}

/// Single-pass consolidation of observation streams.
pub struct SegmentConsolidator {
    config: ConsolidatorConfig,
}

impl SegmentConsolidator {
    /// Create a consolidator with default thresholds.
    pub fn new() -> Self {
        Self {
            config: ConsolidatorConfig::default(),
        }
    }

    /// Create a consolidator with custom thresholds.
    pub fn with_config(config: ConsolidatorConfig) -> Self {
        Self { config }
    }

    /// Consolidate a timestamp-ordered observation stream into stable
    /// segments.
    ///
    /// Maintains one open segment per `source_id`. Each new observation is
    /// compared to the open segment's representative value: similar values
    /// extend the segment, dissimilar ones within `min_gap_seconds` extend
    /// it through the gap, anything else closes it and opens a new one.
    /// Closing segments shorter than `min_segment_duration` are dropped
    /// and their span merged into the source's preceding surviving
    /// segment.
    ///
    /// Observations must be in non-decreasing timestamp order across the
    /// whole stream; a violation is an error, never silently reordered.
    pub fn consolidate<F>(
        &self,
        observations: &[Observation],
        similarity: F,
    ) -> EngineResult<Vec<SourceSegment>>
    where
        F: Fn(&Observable, &Observable) -> f64,
    {
        let mut open: HashMap<String, OpenSegment> = HashMap::new();
        let mut emitted: HashMap<String, Vec<SourceSegment>> = HashMap::new();
        let mut dropped = 0usize;
        let mut prev_timestamp = f64::NEG_INFINITY;

        for obs in observations {
            if obs.timestamp < prev_timestamp {
                return Err(EngineError::InvalidObservationOrder {
                    source_id: obs.source_id.clone(),
                    prev: prev_timestamp,
                    next: obs.timestamp,
                });
            }
            prev_timestamp = obs.timestamp;

            let extends = match open.get(&obs.source_id) {
                None => false,
                Some(segment) => {
                    let score = similarity(&segment.representative, &obs.value);
                    let gap = obs.timestamp - segment.end;
                    score >= self.config.similarity_threshold
                        || gap < self.config.min_gap_seconds
                }
            };

            if extends {
                let segment = open.get_mut(&obs.source_id).expect("open segment present");
                segment.end = obs.timestamp;
            } else {
                // First observation for the source, or one that ends the
                // open segment: close what was open and start fresh here
                if let Some(closing) = open.remove(&obs.source_id) {
                    if !self.close_segment(&obs.source_id, closing, &mut emitted) {
                        dropped += 1;
                    }
                }
                open.insert(
                    obs.source_id.clone(),
                    OpenSegment {
                        start: obs.timestamp,
                        end: obs.timestamp,
                        representative: obs.value,
                    },
                );
            }
        }

        // Close whatever is still open at end of stream
        for (source_id, segment) in open {
            if !self.close_segment(&source_id, segment, &mut emitted) {
                dropped += 1;
            }
        }

        let mut segments: Vec<SourceSegment> = emitted.into_values().flatten().collect();
        segments.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });

        info!(
            observations = observations.len(),
            segments = segments.len(),
            dropped_short = dropped,
            "Consolidated observation stream"
        );

        Ok(segments)
    }

    /// Close an open segment, applying the short-segment policy. Returns
    /// false when the segment was dropped.
    fn close_segment(
        &self,
        source_id: &str,
        segment: OpenSegment,
        emitted: &mut HashMap<String, Vec<SourceSegment>>,
    ) -> bool {
        let duration = segment.end - segment.start;
        let survivors = emitted.entry(source_id.to_string()).or_default();

        if duration >= self.config.min_segment_duration {
            survivors.push(SourceSegment::new(source_id, segment.start, segment.end));
            return true;
        }

        // Too short to be a real switch: the prior stable state continues
        // through the dropped span
        if let Some(prev) = survivors.last_mut() {
            debug!(
                source_id = source_id,
                start = segment.start,
                end = segment.end,
                "Dropping short segment, extending previous through its span"
            );
            prev.end = prev.end.max(segment.end);
        } else {
            debug!(
                source_id = source_id,
                start = segment.start,
                end = segment.end,
                "Dropping short segment with no predecessor"
            );
        }
        false
    }

    /// Merge per-source segments separated by less than `min_gap_seconds`.
    ///
    /// The entry point for pre-segmented input such as raw VAD speech
    /// timestamps: brief silences inside one speaker's turn are treated as
    /// non-terminating, anything longer splits the turn. Segments are
    /// grouped by source; within a source they must be valid and sorted by
    /// `start`.
    pub fn merge_adjacent_segments(
        &self,
        segments: &[SourceSegment],
    ) -> EngineResult<Vec<SourceSegment>> {
        let mut by_source: HashMap<&str, Vec<&SourceSegment>> = HashMap::new();
        for segment in segments {
            if !segment.is_valid() {
                return Err(EngineError::invalid_segment(
                    &segment.source_id,
                    segment.start,
                    segment.end,
                ));
            }
            by_source.entry(&segment.source_id).or_default().push(segment);
        }

        let mut merged: Vec<SourceSegment> = Vec::new();
        for (source_id, group) in &by_source {
            let mut current = (group[0].start, group[0].end);
            for pair in group.windows(2) {
                let (prev, next) = (pair[0], pair[1]);
                if next.start < prev.start {
                    return Err(EngineError::InvalidObservationOrder {
                        source_id: source_id.to_string(),
                        prev: prev.start,
                        next: next.start,
                    });
                }
                if next.start - current.1 < self.config.min_gap_seconds {
                    current.1 = current.1.max(next.end);
                } else {
                    merged.push(SourceSegment::new(*source_id, current.0, current.1));
                    current = (next.start, next.end);
                }
            }
            merged.push(SourceSegment::new(*source_id, current.0, current.1));
        }

        merged.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });
        Ok(merged)
    }
}

impl Default for SegmentConsolidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only the `max_sources` sources with the most total speech time.
///
/// Diarization sometimes reports more sources than there are cameras
/// (crosstalk, background voices). Sources are ranked by total segment
/// duration, not segment count, so one long monologue outweighs many
/// short interjections.
pub fn retain_primary_sources(
    segments: Vec<SourceSegment>,
    max_sources: usize,
) -> Vec<SourceSegment> {
    let mut total_duration: HashMap<String, f64> = HashMap::new();
    for segment in &segments {
        *total_duration.entry(segment.source_id.clone()).or_insert(0.0) += segment.duration();
    }

    if total_duration.len() <= max_sources {
        return segments;
    }

    let mut ranked: Vec<(String, f64)> = total_duration.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(max_sources);
    let keep: Vec<String> = ranked.into_iter().map(|(source, _)| source).collect();

    info!(kept = ?keep, "Retained primary sources by total speech duration");

    segments
        .into_iter()
        .filter(|s| keep.contains(&s.source_id))
        .collect()
}
