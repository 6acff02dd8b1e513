//! Cross-interaction latency statistics for the ARGO pipeline.
//!
//! [`StageAggregator`] accumulates per-stage duration samples from many
//! completed controllers and probes and computes descriptive statistics on
//! demand: count, min, max, mean, median, p95, coefficient of variation and
//! Tukey IQR outliers. Aggregates can be saved to and merged from JSON
//! measurement files, and reduced to a [`BaselineRecord`](argo_types::BaselineRecord)
//! for the regression guard.
//!
//! # Retention
//!
//! By default every sample is kept, which suits short measurement runs.
//! Long-running hosts should use [`StageAggregator::with_sample_cap`], which
//! keeps a sliding window of the most recent samples per stage.

mod aggregator;
mod error;
mod snapshot;

pub use aggregator::{StageAggregator, StageStats, FIRST_TOKEN_STAGE, PIPELINE_STAGES, TOTAL_STAGE};
pub use error::StatsError;
pub use snapshot::{load_snapshot, AggregateSnapshot, StageSnapshot};
