//! Engine configuration.
//!
//! Every tunable the core consumes is an explicit parameter on one of
//! these structs, never a global. [`EngineConfig`] aggregates the
//! per-component configs and can be loaded from `PODCAM_*` environment
//! variables for the binary boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::align::{AlignerConfig, NormalizationMode};
use crate::consolidate::ConsolidatorConfig;
use crate::error::{EngineError, EngineResult};
use crate::switch::SwitchConfig;

/// Aggregate configuration for a full editing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Signal alignment settings
    #[serde(default)]
    pub aligner: AlignerConfig,

    /// Observation consolidation thresholds
    #[serde(default)]
    pub consolidator: ConsolidatorConfig,

    /// Timeline building settings
    #[serde(default)]
    pub switch: SwitchConfig,

    /// Concurrency bound for frame scoring; `None` uses the available
    /// CPU parallelism
    #[serde(default)]
    pub max_parallel_scoring: Option<usize>,
}

impl EngineConfig {
    /// Load configuration from `PODCAM_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            aligner: AlignerConfig {
                normalization: std::env::var("PODCAM_NORMALIZATION")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "min_max" | "minmax" => Some(NormalizationMode::MinMax),
                        "z_score" | "zscore" => Some(NormalizationMode::ZScore),
                        _ => None,
                    })
                    .unwrap_or(defaults.aligner.normalization),
                top_n: env_parsed("PODCAM_TOP_N_OFFSETS", defaults.aligner.top_n),
                calibration: defaults.aligner.calibration,
            },
            consolidator: ConsolidatorConfig {
                similarity_threshold: env_parsed(
                    "PODCAM_SIMILARITY_THRESHOLD",
                    defaults.consolidator.similarity_threshold,
                ),
                min_gap_seconds: env_parsed(
                    "PODCAM_MIN_GAP_SECONDS",
                    defaults.consolidator.min_gap_seconds,
                ),
                min_segment_duration: env_parsed(
                    "PODCAM_MIN_SEGMENT_DURATION",
                    defaults.consolidator.min_segment_duration,
                ),
            },
            switch: SwitchConfig {
                min_clip_duration: env_parsed(
                    "PODCAM_MIN_CLIP_DURATION",
                    defaults.switch.min_clip_duration,
                ),
                default_source: std::env::var("PODCAM_DEFAULT_SOURCE").ok(),
                bias: HashMap::new(),
                priority: Vec::new(),
                cutaway: None,
            },
            max_parallel_scoring: std::env::var("PODCAM_MAX_PARALLEL_SCORING")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Check cross-field sanity before a run starts.
    pub fn validate(&self) -> EngineResult<()> {
        if self.aligner.top_n == 0 {
            return Err(EngineError::invalid_config("top_n must be at least 1"));
        }
        if self.consolidator.min_gap_seconds < 0.0 {
            return Err(EngineError::invalid_config(
                "min_gap_seconds must be non-negative",
            ));
        }
        if self.consolidator.min_segment_duration < 0.0 {
            return Err(EngineError::invalid_config(
                "min_segment_duration must be non-negative",
            ));
        }
        if self.switch.min_clip_duration < 0.0 {
            return Err(EngineError::invalid_config(
                "min_clip_duration must be non-negative",
            ));
        }
        if self.max_parallel_scoring == Some(0) {
            return Err(EngineError::invalid_config(
                "max_parallel_scoring must be at least 1",
            ));
        }
        Ok(())
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_top_n_rejected() {
        let mut config = EngineConfig::default();
        config.aligner.top_n = 0;
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut config = EngineConfig::default();
        config.consolidator.min_gap_seconds = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(back.aligner.top_n, config.aligner.top_n);
    }
}
