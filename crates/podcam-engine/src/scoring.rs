//! Bounded worker pool for per-frame observation scoring.
//!
//! Scoring frames (face detection, mouth-movement measurement) is the
//! expensive step of the pipeline and embarrassingly parallel: each
//! frame's observation depends only on that frame's data. The pool runs
//! scorers on blocking threads with bounded admission and hands the
//! results back sorted by timestamp, which is the order the consolidator
//! requires.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use podcam_models::Observation;

use crate::error::{EngineError, EngineResult};

/// Bounded pool for CPU-bound frame scoring.
pub struct ScoringPool {
    max_parallel: usize,
}

impl ScoringPool {
    /// Create a pool sized to the available CPU parallelism.
    pub fn new() -> Self {
        let max_parallel = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self { max_parallel }
    }

    /// Create a pool with an explicit concurrency bound.
    pub fn with_max_parallel(max_parallel: usize) -> EngineResult<Self> {
        if max_parallel == 0 {
            return Err(EngineError::invalid_config(
                "scoring pool needs at least one worker",
            ));
        }
        Ok(Self { max_parallel })
    }

    /// Maximum number of concurrently running scorers.
    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Score a batch of frame items concurrently.
    ///
    /// Each item is handed to `scorer` on a blocking thread; at most
    /// `max_parallel` scorers run at once. A scorer returning `None`
    /// (e.g. no face in the frame) is skipped. The returned observations
    /// are sorted by `(timestamp, source_id)` regardless of completion
    /// order. A panicked scorer fails the whole batch; a partial result
    /// set would silently skew the downstream segments.
    pub async fn score_frames<T, F>(
        &self,
        items: Vec<T>,
        scorer: F,
    ) -> EngineResult<Vec<Observation>>
    where
        T: Send + 'static,
        F: Fn(T) -> Option<Observation> + Send + Sync + 'static,
    {
        let total = items.len();
        debug!(
            items = total,
            max_parallel = self.max_parallel,
            "Scoring frame batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let scorer = Arc::new(scorer);

        let futures: Vec<_> = items
            .into_iter()
            .map(|item| {
                let semaphore = semaphore.clone();
                let scorer = scorer.clone();
                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| EngineError::scoring_failed(e.to_string()))?;
                    tokio::task::spawn_blocking(move || scorer(item))
                        .await
                        .map_err(|e| {
                            EngineError::scoring_failed(format!("scorer task failed: {}", e))
                        })
                }
            })
            .collect();

        let mut observations = Vec::with_capacity(total);
        for result in join_all(futures).await {
            if let Some(observation) = result? {
                observations.push(observation);
            }
        }

        observations.sort_by(|a, b| {
            a.timestamp
                .total_cmp(&b.timestamp)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });

        info!(
            items = total,
            observations = observations.len(),
            "Frame batch scored"
        );
        Ok(observations)
    }
}

impl Default for ScoringPool {
    fn default() -> Self {
        Self::new()
    }
}
