//! Signal alignment via cross-correlation.
//!
//! Estimates the temporal offset between two feature signals that are
//! believed to capture the same underlying event: an audio loudness
//! envelope against a lip-area series, or two microphones that heard the
//! same room. The offset is found at the maximum of the full
//! cross-correlation; the highest-scoring runner-up lags are returned as
//! candidates so callers can deal with ambiguous peaks (repeated claps and
//! long silences produce near-periodic correlation surfaces) instead of
//! trusting a single number blindly.
//!
//! # Sign convention
//!
//! A positive offset means the second signal (`b`) is *later* than the
//! first (`a`) and must be trimmed from its start (or `a` padded) to
//! align. If `b` is a copy of `a` delayed by `k` samples, the estimated
//! offset is `+k / sample_rate`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use podcam_models::Signal;

use crate::error::{EngineError, EngineResult};

/// How a signal is rescaled before correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Rescale to [0, 1]. For non-negative magnitude-like signals such as
    /// lip area or energy envelopes.
    MinMax,
    /// Rescale to zero mean / unit variance. For zero-centered signals
    /// such as raw audio samples.
    ZScore,
}

/// One correlation peak considered as an offset candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OffsetCandidate {
    /// Offset in seconds, using the aligner's sign convention
    pub lag_seconds: f64,
    /// Correlation magnitude at this lag
    pub score: f64,
}

/// The outcome of aligning two signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Best offset estimate in seconds
    pub offset_seconds: f64,

    /// Highest-scoring distinct lags, descending by score.
    /// `candidates[0].lag_seconds == offset_seconds` unless a calibration
    /// override was applied.
    pub candidates: Vec<OffsetCandidate>,

    /// Whether `offset_seconds` was replaced by a calibration entry
    pub calibrated: bool,
}

/// One calibration entry: offsets landing inside `[min, max]` are replaced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// Lower bound of the suspect range (seconds, inclusive)
    pub min: f64,
    /// Upper bound of the suspect range (seconds, inclusive)
    pub max: f64,
    /// Offset to use instead (seconds)
    pub replace_with: f64,
}

/// An explicit table of offset overrides.
///
/// Replaces ad-hoc hard-coded corrections: when a deployment knows that a
/// particular estimated offset range is an artifact (a clap echo, a
/// looping intro jingle), the operator records the range and the measured
/// true offset here. Empty by default; every application is logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OffsetCalibration {
    pub entries: Vec<CalibrationEntry>,
}

impl OffsetCalibration {
    /// Return the replacement offset if any entry covers `offset`.
    pub fn lookup(&self, offset: f64) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| offset >= e.min && offset <= e.max)
            .map(|e| e.replace_with)
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Configuration for signal alignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignerConfig {
    /// Normalization applied to both signals before correlation
    pub normalization: NormalizationMode,

    /// Number of candidate lags to report (>= 1)
    pub top_n: usize,

    /// Offset override table, empty by default
    #[serde(default)]
    pub calibration: OffsetCalibration,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            normalization: NormalizationMode::MinMax,
            top_n: 5,
            calibration: OffsetCalibration::default(),
        }
    }
}

/// Offset estimator for pairs of feature signals.
pub struct SignalAligner {
    config: AlignerConfig,
}

impl SignalAligner {
    /// Create an aligner with default configuration.
    pub fn new() -> Self {
        Self {
            config: AlignerConfig::default(),
        }
    }

    /// Create an aligner with custom configuration.
    pub fn with_config(config: AlignerConfig) -> Self {
        Self { config }
    }

    /// Estimate the offset between `a` and `b`.
    ///
    /// Signals at different sample rates are resampled to the lower of the
    /// two rates first. The result is bit-reproducible for fixed inputs.
    pub fn align(&self, a: &Signal, b: &Signal) -> EngineResult<AlignmentResult> {
        if self.config.top_n == 0 {
            return Err(EngineError::invalid_config("top_n must be at least 1"));
        }
        if a.is_empty() {
            return Err(EngineError::empty_signal(&a.label));
        }
        if b.is_empty() {
            return Err(EngineError::empty_signal(&b.label));
        }
        if a.sample_rate <= 0.0 {
            return Err(EngineError::invalid_config(format!(
                "signal '{}' has non-positive sample rate {}",
                a.label, a.sample_rate
            )));
        }
        if b.sample_rate <= 0.0 {
            return Err(EngineError::invalid_config(format!(
                "signal '{}' has non-positive sample rate {}",
                b.label, b.sample_rate
            )));
        }

        // Resample to the lower common rate before correlating
        let rate = a.sample_rate.min(b.sample_rate);
        let a_values = resample_to_rate(&a.values, a.sample_rate, rate);
        let b_values = resample_to_rate(&b.values, b.sample_rate, rate);

        let a_norm = normalize(&a_values, self.config.normalization, &a.label)?;
        let b_norm = normalize(&b_values, self.config.normalization, &b.label)?;

        debug!(
            a = %a.label,
            b = %b.label,
            rate = rate,
            lags = a_norm.len() + b_norm.len() - 1,
            "Cross-correlating signals"
        );

        let correlation = cross_correlate(&a_norm, &b_norm);

        // Rank all lags by correlation score; report the top distinct lags.
        // The raw lag `l` satisfies a[i] ~ b[i - l]; a delayed `b` peaks at
        // a negative `l`, so the reported offset is `-l / rate`.
        let b_len = b_norm.len() as i64;
        let mut ranked: Vec<OffsetCandidate> = correlation
            .iter()
            .enumerate()
            .map(|(idx, &score)| {
                let lag = idx as i64 - (b_len - 1);
                OffsetCandidate {
                    lag_seconds: -(lag as f64) / rate,
                    score,
                }
            })
            .collect();
        ranked.sort_by(|x, y| {
            y.score
                .total_cmp(&x.score)
                .then(x.lag_seconds.total_cmp(&y.lag_seconds))
        });
        ranked.truncate(self.config.top_n);

        let best = ranked[0];
        let (offset_seconds, calibrated) = match self.config.calibration.lookup(best.lag_seconds) {
            Some(replacement) => {
                warn!(
                    estimated = best.lag_seconds,
                    replacement = replacement,
                    "Calibration override applied to estimated offset"
                );
                (replacement, true)
            }
            None => (best.lag_seconds, false),
        };

        info!(
            a = %a.label,
            b = %b.label,
            offset_seconds = offset_seconds,
            peak_score = best.score,
            "Alignment estimated"
        );

        Ok(AlignmentResult {
            offset_seconds,
            candidates: ranked,
            calibrated,
        })
    }

    /// Timestamp of the strongest transient (the clapboard heuristic): the
    /// largest sample-to-sample increase in the signal.
    pub fn find_transient(&self, signal: &Signal) -> EngineResult<f64> {
        if signal.len() < 2 {
            return Err(EngineError::empty_signal(&signal.label));
        }

        let mut best_idx = 0usize;
        let mut best_jump = f64::NEG_INFINITY;
        for i in 0..signal.values.len() - 1 {
            let jump = signal.values[i + 1] - signal.values[i];
            if jump > best_jump {
                best_jump = jump;
                best_idx = i;
            }
        }

        if best_jump <= 0.0 {
            return Err(EngineError::degenerate_signal(&signal.label));
        }

        Ok(best_idx as f64 / signal.sample_rate)
    }

    /// Align N tracks that share a common transient: returns the amount to
    /// trim from the start of each track so the transients coincide. The
    /// earliest track gets 0.0.
    pub fn align_by_transient(&self, signals: &[Signal]) -> EngineResult<Vec<f64>> {
        let transient_times: Vec<f64> = signals
            .iter()
            .map(|s| self.find_transient(s))
            .collect::<EngineResult<_>>()?;

        let base = transient_times
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);

        let shifts: Vec<f64> = transient_times.iter().map(|t| t - base).collect();
        info!(tracks = signals.len(), ?shifts, "Transient alignment computed");
        Ok(shifts)
    }
}

impl Default for SignalAligner {
    fn default() -> Self {
        Self::new()
    }
}

/// Resample a series from `from_rate` to `to_rate` by floor-index
/// decimation. A no-op when the rates already match.
fn resample_to_rate(values: &[f64], from_rate: f64, to_rate: f64) -> Vec<f64> {
    if (from_rate - to_rate).abs() < f64::EPSILON || values.is_empty() {
        return values.to_vec();
    }

    let target_count = ((values.len() as f64) * to_rate / from_rate).round().max(1.0) as usize;
    let ratio = values.len() as f64 / target_count as f64;

    let mut resampled = Vec::with_capacity(target_count);
    for i in 0..target_count {
        let src_idx = ((i as f64 * ratio).floor() as usize).min(values.len() - 1);
        resampled.push(values[src_idx]);
    }
    resampled
}

/// Rescale a series for correlation. A flat series is a hard error: the
/// correlation surface of a constant signal is meaningless and would pick
/// an arbitrary lag.
fn normalize(values: &[f64], mode: NormalizationMode, label: &str) -> EngineResult<Vec<f64>> {
    match mode {
        NormalizationMode::MinMax => {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if max - min <= 0.0 {
                return Err(EngineError::degenerate_signal(label));
            }
            Ok(values.iter().map(|v| (v - min) / (max - min)).collect())
        }
        NormalizationMode::ZScore => {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            if variance <= 0.0 {
                return Err(EngineError::degenerate_signal(label));
            }
            let std = variance.sqrt();
            Ok(values.iter().map(|v| (v - mean) / std).collect())
        }
    }
}

/// Full cross-correlation of two series.
///
/// Output index `idx` corresponds to lag `l = idx - (b.len() - 1)` with
/// `c(l) = sum_i a[i] * b[i - l]`, covering every lag in
/// `[-(b.len()-1), a.len()-1]`.
fn cross_correlate(a: &[f64], b: &[f64]) -> Vec<f64> {
    let na = a.len() as i64;
    let nb = b.len() as i64;
    let mut out = Vec::with_capacity((na + nb - 1) as usize);

    for lag in -(nb - 1)..na {
        let i_start = lag.max(0);
        let i_end = (na - 1).min(nb - 1 + lag);
        let mut acc = 0.0f64;
        let mut i = i_start;
        while i <= i_end {
            acc += a[i as usize] * b[(i - lag) as usize];
            i += 1;
        }
        out.push(acc);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A deterministic, non-periodic test waveform.
    fn waveform(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64 * 0.37;
                (t.sin() + (t * 1.7).cos() * 0.5 + (i % 7) as f64 * 0.1).abs() + 0.05
            })
            .collect()
    }

    /// Delay `values` by `k` samples, padding the front with low-level noise.
    fn delayed(values: &[f64], k: usize) -> Vec<f64> {
        let mut out: Vec<f64> = (0..k).map(|i| 0.01 + (i % 3) as f64 * 0.005).collect();
        out.extend_from_slice(&values[..values.len() - k]);
        out
    }

    #[test]
    fn test_round_trip_offset() {
        let rate = 10.0;
        let a = Signal::new("a", rate, waveform(200));
        let b = Signal::new("b", rate, delayed(&a.values, 13));

        let result = SignalAligner::new().align(&a, &b).unwrap();
        // b lags a by 13 samples = 1.3s; positive per the sign convention
        assert!(
            (result.offset_seconds - 1.3).abs() <= 1.0 / rate,
            "offset {} not within one sample of 1.3",
            result.offset_seconds
        );
        assert!(!result.calibrated);
        assert_eq!(result.candidates[0].lag_seconds, result.offset_seconds);
    }

    #[test]
    fn test_alignment_symmetry() {
        let rate = 10.0;
        let a = Signal::new("a", rate, waveform(200));
        let b = Signal::new("b", rate, delayed(&a.values, 8));

        let aligner = SignalAligner::new();
        let forward = aligner.align(&a, &b).unwrap();
        let backward = aligner.align(&b, &a).unwrap();
        assert!(
            (forward.offset_seconds + backward.offset_seconds).abs() <= 1.0 / rate,
            "forward {} and backward {} are not symmetric",
            forward.offset_seconds,
            backward.offset_seconds
        );
    }

    #[test]
    fn test_zscore_round_trip() {
        let rate = 20.0;
        let centered: Vec<f64> = waveform(300).iter().map(|v| v - 0.8).collect();
        let a = Signal::new("a", rate, centered.clone());
        let b = Signal::new("b", rate, delayed(&centered, 10));

        let aligner = SignalAligner::with_config(AlignerConfig {
            normalization: NormalizationMode::ZScore,
            ..Default::default()
        });
        let result = aligner.align(&a, &b).unwrap();
        assert!((result.offset_seconds - 0.5).abs() <= 1.0 / rate);
    }

    #[test]
    fn test_flat_signal_is_error() {
        let a = Signal::new("flat", 10.0, vec![1.0; 100]);
        let b = Signal::new("b", 10.0, waveform(100));
        let result = SignalAligner::new().align(&a, &b);
        assert!(matches!(
            result,
            Err(EngineError::DegenerateSignal { .. })
        ));
    }

    #[test]
    fn test_empty_signal_is_error() {
        let a = Signal::new("empty", 10.0, vec![]);
        let b = Signal::new("b", 10.0, waveform(100));
        let result = SignalAligner::new().align(&a, &b);
        assert!(matches!(result, Err(EngineError::EmptySignal { .. })));
    }

    #[test]
    fn test_mixed_rates_resampled() {
        // Same content sampled at 30 Hz and 10 Hz, no delay
        let coarse = waveform(100);
        let fine: Vec<f64> = coarse
            .iter()
            .flat_map(|&v| std::iter::repeat(v).take(3))
            .collect();
        let a = Signal::new("fine", 30.0, fine);
        let b = Signal::new("coarse", 10.0, coarse);

        let result = SignalAligner::new().align(&a, &b).unwrap();
        assert!(result.offset_seconds.abs() <= 0.1);
    }

    #[test]
    fn test_candidate_count_and_order() {
        let rate = 10.0;
        let a = Signal::new("a", rate, waveform(150));
        let b = Signal::new("b", rate, delayed(&a.values, 5));

        let aligner = SignalAligner::with_config(AlignerConfig {
            top_n: 3,
            ..Default::default()
        });
        let result = aligner.align(&a, &b).unwrap();
        assert_eq!(result.candidates.len(), 3);
        assert!(result.candidates[0].score >= result.candidates[1].score);
        assert!(result.candidates[1].score >= result.candidates[2].score);
    }

    #[test]
    fn test_top_n_zero_rejected() {
        let a = Signal::new("a", 10.0, waveform(50));
        let aligner = SignalAligner::with_config(AlignerConfig {
            top_n: 0,
            ..Default::default()
        });
        assert!(matches!(
            aligner.align(&a, &a),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_calibration_override() {
        let rate = 10.0;
        let a = Signal::new("a", rate, waveform(200));
        let b = Signal::new("b", rate, delayed(&a.values, 13));

        let aligner = SignalAligner::with_config(AlignerConfig {
            calibration: OffsetCalibration {
                entries: vec![CalibrationEntry {
                    min: 1.0,
                    max: 1.6,
                    replace_with: 0.2,
                }],
            },
            ..Default::default()
        });
        let result = aligner.align(&a, &b).unwrap();
        assert!(result.calibrated);
        assert_eq!(result.offset_seconds, 0.2);
        // Candidates still expose the raw estimate
        assert!((result.candidates[0].lag_seconds - 1.3).abs() <= 1.0 / rate);
    }

    #[test]
    fn test_find_transient() {
        let rate = 10.0;
        let mut values = vec![0.02; 60];
        for v in values.iter_mut().skip(30) {
            *v = 0.9;
        }
        let signal = Signal::new("clap", rate, values);
        let t = SignalAligner::new().find_transient(&signal).unwrap();
        // The jump lands between samples 29 and 30
        assert!((t - 2.9).abs() <= 1.0 / rate);
    }

    #[test]
    fn test_find_transient_flat_is_error() {
        let signal = Signal::new("flat", 10.0, vec![0.5; 40]);
        assert!(matches!(
            SignalAligner::new().find_transient(&signal),
            Err(EngineError::DegenerateSignal { .. })
        ));
    }

    #[test]
    fn test_align_by_transient() {
        let rate = 10.0;
        let make = |clap_at: usize| {
            let mut values = vec![0.01; 100];
            for v in values.iter_mut().skip(clap_at) {
                *v = 0.8;
            }
            Signal::new(format!("cam_{clap_at}"), rate, values)
        };

        let signals = vec![make(20), make(35), make(25)];
        let shifts = SignalAligner::new().align_by_transient(&signals).unwrap();
        assert_eq!(shifts[0], 0.0);
        assert!((shifts[1] - 1.5).abs() < 1e-9);
        assert!((shifts[2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_determinism() {
        let a = Signal::new("a", 10.0, waveform(120));
        let b = Signal::new("b", 10.0, delayed(&a.values, 7));
        let aligner = SignalAligner::new();
        let first = aligner.align(&a, &b).unwrap();
        let second = aligner.align(&a, &b).unwrap();
        assert_eq!(first.offset_seconds.to_bits(), second.offset_seconds.to_bits());
        for (x, y) in first.candidates.iter().zip(second.candidates.iter()) {
            assert_eq!(x.score.to_bits(), y.score.to_bits());
        }
    }
}
