//! Pipeline seams and stage orchestration.
//!
//! The core never touches media itself. External feature extractors
//! (audio decoders, face detectors, VADs, diarization models) sit behind
//! the provider traits here; [`EditPipeline`] wires the stages together
//! while keeping each one separately callable, so a caller can stop after
//! alignment or activity detection without building a timeline.

use async_trait::async_trait;
use tracing::{info, instrument};

use podcam_models::{Observation, ScoreTrack, Signal, SourceSegment, Timeline};

use crate::align::{AlignmentResult, SignalAligner};
use crate::config::EngineConfig;
use crate::consolidate::SegmentConsolidator;
use crate::error::EngineResult;
use crate::scoring::ScoringPool;
use crate::switch::SwitchTimelineBuilder;

/// Source of per-track feature signals (audio envelope, lip area).
#[async_trait]
pub trait SignalProvider: Send + Sync {
    /// Extract the feature signal for one source.
    async fn signal(&self, source_id: &str) -> EngineResult<Signal>;
}

/// Source of dense per-frame observations (activity flags, face regions,
/// speaking scores), in non-decreasing timestamp order.
#[async_trait]
pub trait ObservationProvider: Send + Sync {
    /// Extract the observation stream for one source.
    async fn observations(&self, source_id: &str) -> EngineResult<Vec<Observation>>;
}

/// Orchestrates alignment, consolidation and timeline building.
///
/// Stages consume immutable inputs and produce new immutable outputs;
/// abandoning a run between stages is simply not calling the next one.
pub struct EditPipeline {
    config: EngineConfig,
    aligner: SignalAligner,
    consolidator: SegmentConsolidator,
    builder: SwitchTimelineBuilder,
    pool: ScoringPool,
}

impl EditPipeline {
    /// Create a pipeline from a validated configuration.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let pool = match config.max_parallel_scoring {
            Some(n) => ScoringPool::with_max_parallel(n)?,
            None => ScoringPool::new(),
        };
        Ok(Self {
            aligner: SignalAligner::with_config(config.aligner.clone()),
            consolidator: SegmentConsolidator::with_config(config.consolidator.clone()),
            builder: SwitchTimelineBuilder::with_config(config.switch.clone()),
            pool,
            config,
        })
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The scoring pool, for callers that produce observations themselves.
    pub fn scoring_pool(&self) -> &ScoringPool {
        &self.pool
    }

    /// Stage 1: estimate the offset of `other` relative to `reference`.
    #[instrument(skip(self, provider))]
    pub async fn align_sources(
        &self,
        provider: &dyn SignalProvider,
        reference: &str,
        other: &str,
    ) -> EngineResult<AlignmentResult> {
        let a = provider.signal(reference).await?;
        let b = provider.signal(other).await?;
        let result = self.aligner.align(&a, &b)?;
        info!(
            reference = reference,
            other = other,
            offset_seconds = result.offset_seconds,
            "Alignment stage complete"
        );
        Ok(result)
    }

    /// Stage 2: consolidate each source's observation stream into stable
    /// activity segments. Streams are fetched per source and merged in
    /// timestamp order before the scan.
    #[instrument(skip(self, provider, similarity))]
    pub async fn detect_activity<F>(
        &self,
        provider: &dyn ObservationProvider,
        source_ids: &[String],
        similarity: F,
    ) -> EngineResult<Vec<SourceSegment>>
    where
        F: Fn(&podcam_models::Observable, &podcam_models::Observable) -> f64,
    {
        let mut observations = Vec::new();
        for source_id in source_ids {
            observations.extend(provider.observations(source_id).await?);
        }
        observations.sort_by(|a, b| {
            a.timestamp
                .total_cmp(&b.timestamp)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });

        let segments = self.consolidator.consolidate(&observations, similarity)?;
        info!(
            sources = source_ids.len(),
            segments = segments.len(),
            "Activity detection stage complete"
        );
        Ok(segments)
    }

    /// Stage 3a: build the final timeline from activity segments.
    #[instrument(skip(self, segments))]
    pub fn build_timeline(
        &self,
        segments: &[SourceSegment],
        total_duration: f64,
    ) -> EngineResult<Timeline> {
        self.builder.build_from_segments(segments, total_duration)
    }

    /// Stage 3b: build the final timeline from per-source score tracks.
    #[instrument(skip(self, tracks))]
    pub fn build_timeline_from_scores(
        &self,
        tracks: &[ScoreTrack],
        fps: f64,
        total_duration: f64,
    ) -> EngineResult<Timeline> {
        self.builder.build_from_scores(tracks, fps, total_duration)
    }
}
