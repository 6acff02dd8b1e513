//! Aggregate measurement files.
//!
//! A snapshot captures every retained sample plus summary numbers so that
//! measurements from several sessions can be merged and re-analysed later:
//!
//! ```json
//! { "timestamp": "2026-01-01T12:00:00+00:00", "total_interactions": 20, "num_sessions": 2,
//!   "stages": { "llm": { "count": 20, "samples": [...], "min_ms": 800.0,
//!                         "max_ms": 2100.0, "avg_ms": 1200.0, "median_ms": 1150.0 } } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregator::{summarize, StageAggregator};
use crate::error::StatsError;

/// One stage inside an aggregate measurement file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub count: usize,
    pub samples: Vec<f64>,
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub median_ms: f64,
}

/// Contents of an aggregate measurement file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    /// RFC 3339 time the snapshot was taken.
    pub timestamp: String,
    pub total_interactions: u64,
    pub num_sessions: u64,
    pub stages: BTreeMap<String, StageSnapshot>,
}

impl StageAggregator {
    /// Captures the current samples and summaries.
    pub fn snapshot(&self) -> AggregateSnapshot {
        let inner = self.lock();
        let stages = inner
            .stages
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(name, samples)| {
                let samples: Vec<f64> = samples.iter().copied().collect();
                let mut sorted = samples.clone();
                sorted.sort_by(f64::total_cmp);
                let stats = summarize(&sorted);
                (
                    name.clone(),
                    StageSnapshot {
                        count: stats.count,
                        samples,
                        min_ms: stats.min,
                        max_ms: stats.max,
                        avg_ms: stats.avg,
                        median_ms: stats.median,
                    },
                )
            })
            .collect();

        AggregateSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            total_interactions: inner.interactions,
            num_sessions: inner.sessions,
            stages,
        }
    }

    /// Writes the current snapshot to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Io` if the file cannot be written.
    pub fn save_snapshot(&self, path: &Path) -> Result<AggregateSnapshot, StatsError> {
        let snapshot = self.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        tracing::info!(
            path = %path.display(),
            stages = snapshot.stages.len(),
            interactions = snapshot.total_interactions,
            "saved aggregate latency measurements"
        );
        Ok(snapshot)
    }

    /// Adds every sample and counter of `snapshot` to this aggregator.
    ///
    /// Summary fields in the snapshot are ignored; statistics are always
    /// recomputed from samples.
    pub fn merge_snapshot(&self, snapshot: &AggregateSnapshot) {
        let mut inner = self.lock();
        for (stage, stage_snapshot) in &snapshot.stages {
            if stage_snapshot.samples.len() != stage_snapshot.count {
                tracing::warn!(
                    stage = %stage,
                    count = stage_snapshot.count,
                    samples = stage_snapshot.samples.len(),
                    "stage sample count does not match its samples; using samples"
                );
            }
            for &sample in &stage_snapshot.samples {
                self.push(&mut inner, stage, sample);
            }
        }
        inner.interactions += snapshot.total_interactions;
        inner.sessions += snapshot.num_sessions;
    }

    /// Builds an unbounded aggregator from a snapshot.
    pub fn from_snapshot(snapshot: &AggregateSnapshot) -> Self {
        let aggregator = Self::new();
        aggregator.merge_snapshot(snapshot);
        aggregator
    }
}

/// Reads an aggregate measurement file.
///
/// # Errors
///
/// Returns `StatsError::Io` if the file cannot be read and
/// `StatsError::Serialization` if it is not a valid snapshot.
pub fn load_snapshot(path: &Path) -> Result<AggregateSnapshot, StatsError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
