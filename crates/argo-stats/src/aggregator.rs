//! Per-stage sample collection and descriptive statistics.
//!
//! Rank-based statistics use simple floor indexing into the ascending
//! sample list, not interpolation, so numbers stay comparable with
//! historical measurement files:
//!
//! - median: `sorted[n / 2]`
//! - p95: `sorted[min(floor(0.95 * n), n - 1)]`
//! - Q1 / Q3: `sorted[n / 4]` / `sorted[3n / 4]`

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use argo_latency::LatencyProbe;
use argo_types::{BaselineRecord, LatencyReport};
use serde::{Deserialize, Serialize};

/// Pipeline stages in reporting order.
pub const PIPELINE_STAGES: [&str; 7] = [
    "wake_to_record",
    "recording",
    "stt",
    "parsing",
    "llm",
    "tts",
    "total",
];

/// Stage fed from the `first_token_received` checkpoint of controller reports.
pub const FIRST_TOKEN_STAGE: &str = "first_token";

/// Stage fed from the elapsed time of controller reports and finished probes.
pub const TOTAL_STAGE: &str = "total";

/// Tukey fence multiplier.
const IQR_FENCE: f64 = 1.5;

/// Descriptive statistics for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
}

#[derive(Debug, Default)]
pub(crate) struct Samples {
    pub(crate) stages: HashMap<String, VecDeque<f64>>,
    pub(crate) interactions: u64,
    pub(crate) sessions: u64,
}

/// Collects duration samples per stage across many interactions.
///
/// Safe to share between threads; every mutation takes an internal lock.
/// Statistics are computed from the retained samples on every call.
#[derive(Debug, Default)]
pub struct StageAggregator {
    inner: Mutex<Samples>,
    sample_cap: Option<usize>,
}

impl StageAggregator {
    /// Creates an aggregator that keeps every sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an aggregator that keeps at most `cap` samples per stage,
    /// evicting the oldest first.
    pub fn with_sample_cap(cap: usize) -> Self {
        Self {
            inner: Mutex::default(),
            sample_cap: Some(cap.max(1)),
        }
    }

    /// Appends one duration sample to `stage`. Non-finite values are dropped.
    pub fn add_sample(&self, stage: &str, duration_ms: f64) {
        let mut inner = self.lock();
        self.push(&mut inner, stage, duration_ms);
    }

    /// Rolls a controller report into the statistics: `total` gets the
    /// elapsed time and `first_token` the first-token checkpoint, if logged.
    pub fn add_report(&self, report: &LatencyReport) {
        let mut inner = self.lock();
        self.push(&mut inner, TOTAL_STAGE, report.elapsed_ms);
        if let Some(first_token_ms) = report.first_token_ms() {
            self.push(&mut inner, FIRST_TOKEN_STAGE, first_token_ms);
        }
        inner.interactions += 1;
    }

    /// Rolls every completed stage of a probe into the statistics.
    pub fn add_probe(&self, probe: &LatencyProbe) {
        let durations = probe.durations();
        let mut inner = self.lock();
        for (stage, duration_ms) in &durations {
            self.push(&mut inner, stage, *duration_ms);
        }
        inner.interactions += 1;
    }

    /// Counts the start of a new measurement session.
    pub fn begin_session(&self) {
        self.lock().sessions += 1;
    }

    /// Number of reports and probes rolled in so far.
    pub fn interaction_count(&self) -> u64 {
        self.lock().interactions
    }

    pub fn session_count(&self) -> u64 {
        self.lock().sessions
    }

    /// Retained samples for `stage` in insertion order.
    pub fn samples(&self, stage: &str) -> Vec<f64> {
        self.lock()
            .stages
            .get(stage)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns `None` if `stage` has no samples.
    pub fn stats(&self, stage: &str) -> Option<StageStats> {
        self.sorted_samples(stage).map(|sorted| summarize(&sorted))
    }

    /// 95th percentile by nearest rank. `None` if `stage` has no samples.
    pub fn p95(&self, stage: &str) -> Option<f64> {
        self.sorted_samples(stage)
            .map(|sorted| nearest_rank(&sorted, 0.95))
    }

    /// Population standard deviation as a percentage of the mean.
    ///
    /// `None` if `stage` has no samples or its mean is zero.
    pub fn coefficient_of_variation(&self, stage: &str) -> Option<f64> {
        let samples = self.samples(stage);
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        if mean == 0.0 {
            return None;
        }
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Some(variance.sqrt() / mean * 100.0)
    }

    /// Samples outside Tukey's fences, in ascending order.
    pub fn detect_outliers(&self, stage: &str) -> Vec<f64> {
        let Some(sorted) = self.sorted_samples(stage) else {
            return Vec::new();
        };
        let n = sorted.len();
        let q1 = sorted[n / 4];
        let q3 = sorted[(3 * n / 4).min(n - 1)];
        let iqr = q3 - q1;
        let lower = q1 - IQR_FENCE * iqr;
        let upper = q3 + IQR_FENCE * iqr;
        sorted
            .into_iter()
            .filter(|&x| x < lower || x > upper)
            .collect()
    }

    /// Stages with samples: pipeline stages in pipeline order, then any
    /// other stage alphabetically.
    pub fn stage_names(&self) -> Vec<String> {
        let inner = self.lock();
        let mut names: Vec<String> = PIPELINE_STAGES
            .into_iter()
            .filter(|s| inner.stages.get(*s).is_some_and(|v| !v.is_empty()))
            .map(|s| s.to_string())
            .collect();
        let mut extra: Vec<String> = inner
            .stages
            .iter()
            .filter(|(name, v)| !v.is_empty() && !PIPELINE_STAGES.contains(&name.as_str()))
            .map(|(name, _)| name.clone())
            .collect();
        extra.sort();
        names.extend(extra);
        names
    }

    /// Derives a baseline from the medians of `first_token` and `total`.
    pub fn baseline(&self) -> Option<BaselineRecord> {
        let first_token = self.stats(FIRST_TOKEN_STAGE)?;
        let total = self.stats(TOTAL_STAGE)?;
        Some(BaselineRecord {
            first_token_ms: first_token.median,
            total_response_ms: total.median,
        })
    }

    /// Renders a fixed-width table of every stage with samples.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<16}{:>7}{:>11}{:>11}{:>11}{:>11}{:>11}",
            "stage", "count", "min_ms", "max_ms", "avg_ms", "median_ms", "p95_ms"
        );
        for stage in self.stage_names() {
            let Some(sorted) = self.sorted_samples(&stage) else {
                continue;
            };
            let stats = summarize(&sorted);
            let _ = writeln!(
                out,
                "{:<16}{:>7}{:>11.1}{:>11.1}{:>11.1}{:>11.1}{:>11.1}",
                stage,
                stats.count,
                stats.min,
                stats.max,
                stats.avg,
                stats.median,
                nearest_rank(&sorted, 0.95)
            );
        }
        out
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Samples> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push(&self, inner: &mut Samples, stage: &str, duration_ms: f64) {
        if !duration_ms.is_finite() {
            tracing::warn!(stage, duration_ms, "dropping non-finite latency sample");
            return;
        }
        let samples = inner.stages.entry(stage.to_string()).or_default();
        if let Some(cap) = self.sample_cap {
            while samples.len() >= cap {
                samples.pop_front();
            }
        }
        samples.push_back(duration_ms);
    }

    fn sorted_samples(&self, stage: &str) -> Option<Vec<f64>> {
        let mut sorted = self.samples(stage);
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        Some(sorted)
    }
}

/// Summarises a non-empty, ascending slice.
pub(crate) fn summarize(sorted: &[f64]) -> StageStats {
    let count = sorted.len();
    StageStats {
        count,
        min: sorted[0],
        max: sorted[count - 1],
        avg: sorted.iter().sum::<f64>() / count as f64,
        median: sorted[count / 2],
    }
}

fn nearest_rank(sorted: &[f64], quantile: f64) -> f64 {
    let idx = ((quantile * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}
