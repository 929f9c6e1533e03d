//! Shared data models for the PodCam editing core.
//!
//! This crate provides Serde-serializable types for:
//! - Feature signals extracted from audio/video tracks
//! - Per-frame observations (activity flags, face regions, scores)
//! - Activity segments and the final switch timeline
//! - Timestamp parsing for the tooling boundary

pub mod observation;
pub mod rect;
pub mod segment;
pub mod signal;
pub mod timeline;
pub mod timestamp;

// Re-export common types
pub use observation::{Observable, Observation};
pub use rect::NormalizedRect;
pub use segment::SourceSegment;
pub use signal::{ScoreTrack, Signal};
pub use timeline::{Timeline, TimelineError, TimelineSegment, TimelineStats};
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
