#![deny(unreachable_patterns)]
//! Alignment, consolidation and switch-timeline core for multi-camera
//! podcast editing.
//!
//! This crate provides:
//! - Cross-correlation offset estimation between feature signals, with
//!   candidate peaks exposed for ambiguous alignments
//! - Consolidation of dense, noisy observation streams into stable,
//!   minimum-duration activity segments
//! - Construction of the final gap-free switch timeline, segment-driven
//!   or score-driven, with hysteresis and main-camera cutaways
//! - A bounded worker pool for parallel per-frame scoring
//!
//! Media decoding, model inference and ffmpeg invocation live behind the
//! provider traits in [`pipeline`]; the core consumes and produces plain
//! in-memory data.

pub mod align;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod pipeline;
pub mod scoring;
pub mod switch;

pub use align::{
    AlignerConfig, AlignmentResult, CalibrationEntry, NormalizationMode, OffsetCalibration,
    OffsetCandidate, SignalAligner,
};
pub use config::EngineConfig;
pub use consolidate::{
    retain_primary_sources, similarity, ConsolidatorConfig, SegmentConsolidator,
};
pub use error::{EngineError, EngineResult};
pub use pipeline::{EditPipeline, ObservationProvider, SignalProvider};
pub use scoring::ScoringPool;
pub use switch::{CutawayConfig, SwitchConfig, SwitchTimelineBuilder};
