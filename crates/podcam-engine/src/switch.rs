//! Switch timeline construction.
//!
//! Produces the single, final, gap-free timeline describing which camera
//! is live at every instant of `[0, total_duration)`. Two modes share one
//! builder: segment-driven switching from consolidated speaker segments
//! (diarization-style turn taking) and score-driven switching from
//! per-source score tracks sampled at a fixed rate (mouth movement, face
//! presence). Both guarantee the timeline invariants on output; a bad
//! timeline aborts the run instead of reaching the video assembler.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use podcam_models::{ScoreTrack, SourceSegment, Timeline, TimelineSegment};

use crate::error::{EngineError, EngineResult};

/// Tolerance when matching track lengths against the total duration.
const DURATION_EPSILON: f64 = 1e-9;

/// Periodic cuts to a wide/main camera inside long single-speaker spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutawayConfig {
    /// Camera to cut away to (usually the wide shot)
    pub source_id: String,

    /// Target spacing between cutaways in seconds. Spans are divided into
    /// equal pieces no shorter than half this interval.
    pub interval_seconds: f64,
}

/// Configuration for timeline building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Segments or score dwells shorter than this never become a cut
    pub min_clip_duration: f64,

    /// Source used when nothing else claims an interval
    pub default_source: Option<String>,

    /// Per-source multiplicative weight applied to scores before
    /// comparison (score mode). Sources without an entry get 1.0.
    #[serde(default)]
    pub bias: HashMap<String, f64>,

    /// Tie-break order for equal weighted scores; sources not listed rank
    /// after listed ones, lexicographically
    #[serde(default)]
    pub priority: Vec<String>,

    /// Optional main-camera cutaway interleaving (segment mode)
    #[serde(default)]
    pub cutaway: Option<CutawayConfig>,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            min_clip_duration: 1.0,
            default_source: None,
            bias: HashMap::new(),
            priority: Vec::new(),
            cutaway: None,
        }
    }
}

impl SwitchConfig {
    fn validate(&self) -> EngineResult<()> {
        if self.min_clip_duration < 0.0 {
            return Err(EngineError::invalid_config(format!(
                "min_clip_duration must be non-negative, got {}",
                self.min_clip_duration
            )));
        }
        if let Some(cutaway) = &self.cutaway {
            if cutaway.interval_seconds <= 0.0 {
                return Err(EngineError::invalid_config(format!(
                    "cutaway interval must be positive, got {}",
                    cutaway.interval_seconds
                )));
            }
        }
        for (source, bias) in &self.bias {
            if !bias.is_finite() || *bias < 0.0 {
                return Err(EngineError::invalid_config(format!(
                    "bias for '{}' must be finite and non-negative, got {}",
                    source, bias
                )));
            }
        }
        Ok(())
    }
}

/// Builder for the final switch timeline.
pub struct SwitchTimelineBuilder {
    config: SwitchConfig,
}

impl SwitchTimelineBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: SwitchConfig::default(),
        }
    }

    /// Create a builder with custom configuration.
    pub fn with_config(config: SwitchConfig) -> Self {
        Self { config }
    }

    /// Build a timeline from per-source speaker segments.
    ///
    /// Segments may overlap across sources and need not cover the full
    /// duration. Overlap resolves first-claimed-wins: a segment fully
    /// inside prior coverage is discarded, a partially overlapped one is
    /// trimmed at the front. Surviving segments cut from the previous
    /// segment's end so interior gaps are absorbed by the next speaker.
    pub fn build_from_segments(
        &self,
        segments: &[SourceSegment],
        total_duration: f64,
    ) -> EngineResult<Timeline> {
        self.config.validate()?;
        if total_duration <= 0.0 {
            return Err(EngineError::invalid_config(format!(
                "total_duration must be positive, got {}",
                total_duration
            )));
        }
        for segment in segments {
            if !segment.is_valid() {
                return Err(EngineError::invalid_segment(
                    &segment.source_id,
                    segment.start,
                    segment.end,
                ));
            }
        }

        let mut ordered: Vec<&SourceSegment> = segments.iter().collect();
        ordered.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });

        let mut timeline: Vec<TimelineSegment> = Vec::new();
        let mut last_end = 0.0f64;

        for segment in ordered {
            if segment.start >= total_duration {
                debug!(
                    source_id = %segment.source_id,
                    start = segment.start,
                    "Segment starts past the total duration, skipping"
                );
                continue;
            }
            let end = segment.end.min(total_duration);

            if end <= last_end {
                // Fully superseded by prior coverage
                continue;
            }
            let clamped_start = segment.start.max(last_end);
            if end - clamped_start < self.config.min_clip_duration {
                debug!(
                    source_id = %segment.source_id,
                    start = clamped_start,
                    end = end,
                    "Clip too short after overlap trim, skipping"
                );
                continue;
            }

            // Cut from the previous end so the timeline stays contiguous
            timeline.push(TimelineSegment::new(&segment.source_id, last_end, end));
            last_end = end;
        }

        if timeline.is_empty() {
            let fallback = self
                .config
                .default_source
                .as_deref()
                .ok_or(EngineError::NoViableTimeline)?;
            warn!(
                source_id = fallback,
                "No segments survived filtering, falling back to default source"
            );
            timeline.push(TimelineSegment::new(fallback, 0.0, total_duration));
        } else if last_end < total_duration {
            timeline
                .last_mut()
                .expect("timeline non-empty")
                .end = total_duration;
        }

        if let Some(cutaway) = &self.config.cutaway {
            timeline = interleave_cutaways(timeline, cutaway);
        }

        let timeline = Timeline::new(timeline, total_duration)?;
        info!(
            segments_in = segments.len(),
            cuts = timeline.cut_count(),
            total_duration = total_duration,
            "Built segment-driven timeline"
        );
        Ok(timeline)
    }

    /// Build a timeline from per-source score tracks sampled at `fps`.
    ///
    /// At each step the source with the highest biased score wins; a
    /// switch commits only after the current source has been live for at
    /// least `min_clip_duration` (hysteresis against per-frame flicker).
    pub fn build_from_scores(
        &self,
        tracks: &[ScoreTrack],
        fps: f64,
        total_duration: f64,
    ) -> EngineResult<Timeline> {
        self.config.validate()?;
        if tracks.is_empty() {
            return Err(EngineError::invalid_config("no score tracks supplied"));
        }
        if fps <= 0.0 {
            return Err(EngineError::invalid_config(format!(
                "fps must be positive, got {}",
                fps
            )));
        }
        if total_duration <= 0.0 {
            return Err(EngineError::invalid_config(format!(
                "total_duration must be positive, got {}",
                total_duration
            )));
        }

        let num_samples = tracks[0].len();
        for track in tracks {
            if track.len() != num_samples {
                return Err(EngineError::invalid_config(format!(
                    "score track '{}' has {} samples, expected {}",
                    track.source_id,
                    track.len(),
                    num_samples
                )));
            }
            if track.scores.iter().any(|s| !s.is_finite()) {
                return Err(EngineError::invalid_config(format!(
                    "score track '{}' contains non-finite values",
                    track.source_id
                )));
            }
        }
        let covered = num_samples as f64 / fps;
        if covered + 1.0 / fps + DURATION_EPSILON < total_duration {
            return Err(EngineError::invalid_config(format!(
                "{} samples at {} fps cover {:.3}s, short of total_duration {:.3}s",
                num_samples, fps, covered, total_duration
            )));
        }

        let step = 1.0 / fps;
        let mut current = self.initial_source(tracks)?;
        let mut segment_start = 0.0f64;
        let mut timeline: Vec<TimelineSegment> = Vec::new();

        for i in 0..num_samples {
            let t = i as f64 * step;
            if t >= total_duration {
                break;
            }
            let winning = self.winning_source(tracks, i);

            if winning != current && t - segment_start >= self.config.min_clip_duration {
                timeline.push(TimelineSegment::new(&current, segment_start, t));
                segment_start = t;
                current = winning;
            }
        }

        // Trailing segment runs to the requested duration
        if segment_start < total_duration {
            timeline.push(TimelineSegment::new(&current, segment_start, total_duration));
        }

        let timeline = Timeline::new(timeline, total_duration)?;
        info!(
            sources = tracks.len(),
            samples = num_samples,
            cuts = timeline.cut_count(),
            total_duration = total_duration,
            "Built score-driven timeline"
        );
        Ok(timeline)
    }

    /// The source that is live before any scores are considered.
    fn initial_source(&self, tracks: &[ScoreTrack]) -> EngineResult<String> {
        if let Some(default) = &self.config.default_source {
            if tracks.iter().any(|t| &t.source_id == default) {
                return Ok(default.clone());
            }
            return Err(EngineError::invalid_config(format!(
                "default source '{}' has no score track",
                default
            )));
        }
        if let Some(first) = self
            .config
            .priority
            .iter()
            .find(|p| tracks.iter().any(|t| t.source_id == **p))
        {
            return Ok(first.clone());
        }
        let mut sources: Vec<&str> = tracks.iter().map(|t| t.source_id.as_str()).collect();
        sources.sort();
        Ok(sources[0].to_string())
    }

    /// Source with the highest biased score at sample `i`, ties broken by
    /// the configured priority order and then lexicographically.
    fn winning_source(&self, tracks: &[ScoreTrack], i: usize) -> String {
        let mut best: Option<(&str, f64)> = None;
        for track in tracks {
            let bias = self.bias_for(&track.source_id);
            let weighted = track.scores[i] * bias;
            let better = match best {
                None => true,
                Some((current, best_score)) => {
                    weighted > best_score
                        || (weighted == best_score
                            && self.rank(&track.source_id) < self.rank(current))
                }
            };
            if better {
                best = Some((&track.source_id, weighted));
            }
        }
        best.expect("at least one track").0.to_string()
    }

    fn bias_for(&self, source_id: &str) -> f64 {
        self.config.bias.get(source_id).copied().unwrap_or(1.0)
    }

    /// Lower ranks win ties. Listed sources rank by position; unlisted
    /// ones rank after, ordered by id.
    fn rank(&self, source_id: &str) -> (usize, String) {
        let position = self
            .config
            .priority
            .iter()
            .position(|p| p == source_id)
            .unwrap_or(self.config.priority.len());
        (position, source_id.to_string())
    }
}

impl Default for SwitchTimelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Break long spans up with periodic cuts to the cutaway camera.
///
/// Each span is divided into `floor(span / interval) + 1` equal pieces,
/// alternating original source and cutaway source, starting with the
/// original. Pieces are always longer than half the interval, and spans
/// shorter than the interval come through whole. Spans already on the
/// cutaway camera are left alone.
fn interleave_cutaways(
    timeline: Vec<TimelineSegment>,
    cutaway: &CutawayConfig,
) -> Vec<TimelineSegment> {
    let mut out = Vec::with_capacity(timeline.len());

    for segment in timeline {
        let span = segment.duration();
        let pieces = (span / cutaway.interval_seconds).floor() as usize + 1;
        if pieces < 2 || segment.source_id == cutaway.source_id {
            out.push(segment);
            continue;
        }

        let piece_duration = span / pieces as f64;
        for i in 0..pieces {
            let start = segment.start + i as f64 * piece_duration;
            // Compute the final boundary exactly so contiguity survives
            // float accumulation
            let end = if i + 1 == pieces {
                segment.end
            } else {
                segment.start + (i + 1) as f64 * piece_duration
            };
            let source = if i % 2 == 0 {
                segment.source_id.clone()
            } else {
                cutaway.source_id.clone()
            };
            out.push(TimelineSegment::new(source, start, end));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_default(source: &str) -> SwitchConfig {
        SwitchConfig {
            default_source: Some(source.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_segment_mode_basic() {
        let segments = vec![
            SourceSegment::new("host", 0.0, 10.0),
            SourceSegment::new("guest", 10.0, 20.0),
        ];
        let timeline = SwitchTimelineBuilder::new()
            .build_from_segments(&segments, 20.0)
            .unwrap();

        assert_eq!(timeline.segments.len(), 2);
        assert_eq!(timeline.source_at(5.0), Some("host"));
        assert_eq!(timeline.source_at(15.0), Some("guest"));
    }

    #[test]
    fn test_segment_mode_overlap_first_claimed_wins() {
        let segments = vec![
            SourceSegment::new("host", 0.0, 10.0),
            // Fully inside the host's claim: discarded
            SourceSegment::new("guest", 2.0, 8.0),
            // Partially overlapping: trimmed to [10, 15]
            SourceSegment::new("guest", 7.0, 15.0),
        ];
        let timeline = SwitchTimelineBuilder::new()
            .build_from_segments(&segments, 15.0)
            .unwrap();

        assert_eq!(timeline.segments.len(), 2);
        assert_eq!(timeline.source_at(9.0), Some("host"));
        assert_eq!(timeline.source_at(12.0), Some("guest"));
        assert!((timeline.segments[1].start - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_mode_short_clip_dropped() {
        let segments = vec![
            SourceSegment::new("host", 0.0, 10.0),
            // Only 0.5s survives the overlap trim: below min_clip_duration
            SourceSegment::new("guest", 9.5, 10.5),
            SourceSegment::new("host", 10.5, 20.0),
        ];
        let timeline = SwitchTimelineBuilder::new()
            .build_from_segments(&segments, 20.0)
            .unwrap();

        assert!(timeline.segments.iter().all(|s| s.source_id == "host"));
    }

    #[test]
    fn test_segment_mode_interior_gap_absorbed() {
        // Nobody speaks during [10, 14); the next speaker's cut starts at
        // the previous end so the timeline stays contiguous
        let segments = vec![
            SourceSegment::new("host", 0.0, 10.0),
            SourceSegment::new("guest", 14.0, 20.0),
        ];
        let timeline = SwitchTimelineBuilder::new()
            .build_from_segments(&segments, 20.0)
            .unwrap();

        assert_eq!(timeline.segments.len(), 2);
        assert_eq!(timeline.source_at(12.0), Some("guest"));
        timeline.validate().unwrap();
    }

    #[test]
    fn test_segment_mode_trailing_gap_extends_last() {
        let segments = vec![SourceSegment::new("host", 0.0, 15.0)];
        let timeline = SwitchTimelineBuilder::new()
            .build_from_segments(&segments, 20.0)
            .unwrap();

        assert_eq!(timeline.segments.len(), 1);
        assert!((timeline.segments[0].end - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_mode_fallback_source() {
        let timeline = SwitchTimelineBuilder::with_config(config_with_default("main"))
            .build_from_segments(&[], 30.0)
            .unwrap();

        assert_eq!(timeline.segments.len(), 1);
        assert_eq!(timeline.source_at(10.0), Some("main"));
    }

    #[test]
    fn test_segment_mode_no_fallback_is_error() {
        let result = SwitchTimelineBuilder::new().build_from_segments(&[], 30.0);
        assert!(matches!(result, Err(EngineError::NoViableTimeline)));
    }

    #[test]
    fn test_segment_mode_invalid_segment_rejected() {
        let segments = vec![SourceSegment::new("host", 5.0, 5.0)];
        let result = SwitchTimelineBuilder::new().build_from_segments(&segments, 10.0);
        assert!(matches!(result, Err(EngineError::InvalidSegment { .. })));
    }

    #[test]
    fn test_segment_mode_overshoot_clamped() {
        // Diarization often runs a hair past the probed duration
        let segments = vec![SourceSegment::new("host", 0.0, 20.4)];
        let timeline = SwitchTimelineBuilder::new()
            .build_from_segments(&segments, 20.0)
            .unwrap();
        assert!((timeline.segments[0].end - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_cutaway_interleave() {
        let segments = vec![SourceSegment::new("host", 0.0, 20.0)];
        let config = SwitchConfig {
            cutaway: Some(CutawayConfig {
                source_id: "wide".to_string(),
                interval_seconds: 7.0,
            }),
            ..Default::default()
        };
        let timeline = SwitchTimelineBuilder::with_config(config)
            .build_from_segments(&segments, 20.0)
            .unwrap();

        // 20s span with a 7s interval: 3 equal pieces, host/wide/host
        assert_eq!(timeline.segments.len(), 3);
        assert_eq!(timeline.segments[0].source_id, "host");
        assert_eq!(timeline.segments[1].source_id, "wide");
        assert_eq!(timeline.segments[2].source_id, "host");
        timeline.validate().unwrap();
    }

    #[test]
    fn test_cutaway_short_span_untouched() {
        let segments = vec![
            SourceSegment::new("host", 0.0, 5.0),
            SourceSegment::new("guest", 5.0, 10.0),
        ];
        let config = SwitchConfig {
            cutaway: Some(CutawayConfig {
                source_id: "wide".to_string(),
                interval_seconds: 7.0,
            }),
            ..Default::default()
        };
        let timeline = SwitchTimelineBuilder::with_config(config)
            .build_from_segments(&segments, 10.0)
            .unwrap();

        assert_eq!(timeline.segments.len(), 2);
        assert!(timeline.segments.iter().all(|s| s.source_id != "wide"));
    }

    #[test]
    fn test_score_mode_concrete_scenario() {
        let tracks = vec![
            ScoreTrack::new("left", vec![1.0, 1.0, 0.0, 0.0, 5.0, 5.0]),
            ScoreTrack::new("right", vec![0.0, 0.0, 2.0, 2.0, 0.0, 0.0]),
        ];
        let config = SwitchConfig {
            min_clip_duration: 2.0,
            default_source: Some("left".to_string()),
            ..Default::default()
        };
        let timeline = SwitchTimelineBuilder::with_config(config)
            .build_from_scores(&tracks, 1.0, 6.0)
            .unwrap();

        assert_eq!(
            timeline.segments,
            vec![
                TimelineSegment::new("left", 0.0, 2.0),
                TimelineSegment::new("right", 2.0, 4.0),
                TimelineSegment::new("left", 4.0, 6.0),
            ]
        );
    }

    #[test]
    fn test_score_mode_hysteresis() {
        // Winner flips every sample; min_clip_duration forbids following it
        let left: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
        let right: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
        let tracks = vec![
            ScoreTrack::new("left", left),
            ScoreTrack::new("right", right),
        ];
        let config = SwitchConfig {
            min_clip_duration: 2.0,
            default_source: Some("left".to_string()),
            ..Default::default()
        };
        let timeline = SwitchTimelineBuilder::with_config(config)
            .build_from_scores(&tracks, 4.0, 10.0)
            .unwrap();

        for (i, segment) in timeline.segments.iter().enumerate() {
            let is_last = i + 1 == timeline.segments.len();
            if !is_last {
                assert!(
                    segment.duration() >= 2.0 - 1e-9,
                    "segment {} shorter than min_clip_duration: {:?}",
                    i,
                    segment
                );
            }
        }
    }

    #[test]
    fn test_score_mode_bias() {
        // Raw scores favour the guest; a strong host bias overrides
        let tracks = vec![
            ScoreTrack::new("host", vec![1.0; 8]),
            ScoreTrack::new("guest", vec![1.5; 8]),
        ];
        let config = SwitchConfig {
            min_clip_duration: 1.0,
            default_source: Some("host".to_string()),
            bias: HashMap::from([("host".to_string(), 2.0)]),
            ..Default::default()
        };
        let timeline = SwitchTimelineBuilder::with_config(config)
            .build_from_scores(&tracks, 1.0, 8.0)
            .unwrap();

        assert_eq!(timeline.segments.len(), 1);
        assert_eq!(timeline.source_at(4.0), Some("host"));
    }

    #[test]
    fn test_score_mode_tie_break_by_priority() {
        let tracks = vec![
            ScoreTrack::new("b_cam", vec![1.0; 4]),
            ScoreTrack::new("a_cam", vec![1.0; 4]),
        ];
        let config = SwitchConfig {
            min_clip_duration: 1.0,
            priority: vec!["b_cam".to_string(), "a_cam".to_string()],
            ..Default::default()
        };
        let timeline = SwitchTimelineBuilder::with_config(config)
            .build_from_scores(&tracks, 1.0, 4.0)
            .unwrap();

        assert_eq!(timeline.source_at(0.0), Some("b_cam"));
    }

    #[test]
    fn test_score_mode_length_mismatch_rejected() {
        let tracks = vec![
            ScoreTrack::new("left", vec![1.0; 10]),
            ScoreTrack::new("right", vec![1.0; 8]),
        ];
        let result = SwitchTimelineBuilder::with_config(config_with_default("left"))
            .build_from_scores(&tracks, 1.0, 10.0);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_score_mode_short_track_rejected() {
        let tracks = vec![ScoreTrack::new("left", vec![1.0; 4])];
        let result = SwitchTimelineBuilder::with_config(config_with_default("left"))
            .build_from_scores(&tracks, 1.0, 60.0);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_score_mode_nan_rejected() {
        let tracks = vec![ScoreTrack::new("left", vec![1.0, f64::NAN, 1.0])];
        let result = SwitchTimelineBuilder::with_config(config_with_default("left"))
            .build_from_scores(&tracks, 1.0, 3.0);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_score_mode_partial_trailing_step() {
        // 7 samples at 2 fps cover 3.5s; a 3.25s duration leaves one
        // unavoidable short trailing segment
        let tracks = vec![ScoreTrack::new("left", vec![1.0; 7])];
        let timeline = SwitchTimelineBuilder::with_config(config_with_default("left"))
            .build_from_scores(&tracks, 2.0, 3.25)
            .unwrap();
        timeline.validate().unwrap();
        assert!((timeline.segments.last().unwrap().end - 3.25).abs() < 1e-9);
    }

    #[test]
    fn test_timeline_contiguity_invariants() {
        let segments = vec![
            SourceSegment::new("host", 1.0, 8.0),
            SourceSegment::new("guest", 9.0, 14.0),
            SourceSegment::new("host", 13.0, 19.0),
        ];
        let timeline = SwitchTimelineBuilder::new()
            .build_from_segments(&segments, 21.0)
            .unwrap();

        assert!((timeline.segments[0].start).abs() < 1e-9);
        assert!((timeline.segments.last().unwrap().end - 21.0).abs() < 1e-9);
        for pair in timeline.segments.windows(2) {
            assert!((pair[0].end - pair[1].start).abs() < 1e-9);
        }
    }
}
