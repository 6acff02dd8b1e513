//! Regression detection against stored per-profile baselines.
//!
//! Baselines are stored one JSON file per profile:
//!
//! ```text
//! <baseline_dir>/latency_baseline_ARGO.json
//! { "first_token_ms": 1000.0, "total_response_ms": 5000.0 }
//! ```
//!
//! A missing baseline is not an error. Checks against a profile with no
//! baseline always report no regression.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use argo_types::{BaselineRecord, LatencyMetric, Profile};
use serde::{Deserialize, Serialize};

use crate::error::LatencyError;
use crate::event::{EventSink, LatencyEvent, TracingSink};

/// First-token latency may be at most 15% slower than baseline.
pub const FIRST_TOKEN_REGRESSION_FACTOR: f64 = 1.15;

/// Total-response latency may be at most 20% slower than baseline.
pub const TOTAL_RESPONSE_REGRESSION_FACTOR: f64 = 1.20;

/// Returns the baseline file path for `profile` inside `dir`.
pub fn baseline_path(dir: &Path, profile: Profile) -> PathBuf {
    dir.join(format!("latency_baseline_{}.json", profile.as_str()))
}

/// Reads the baseline for `profile`. Returns `Ok(None)` if no file exists.
///
/// # Errors
///
/// Returns `LatencyError::Io` if the file exists but cannot be read and
/// `LatencyError::Serialization` if it is not a valid baseline record.
pub fn load_baseline(dir: &Path, profile: Profile) -> Result<Option<BaselineRecord>, LatencyError> {
    let path = baseline_path(dir, profile);
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LatencyError::Io(e)),
    }
}

/// Writes the baseline for `profile`, creating `dir` if needed, and returns
/// the file path.
///
/// # Errors
///
/// Returns `LatencyError::Io` if the directory or file cannot be written.
pub fn save_baseline(
    dir: &Path,
    profile: Profile,
    record: &BaselineRecord,
) -> Result<PathBuf, LatencyError> {
    std::fs::create_dir_all(dir)?;
    let path = baseline_path(dir, profile);
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json)?;
    tracing::info!(%profile, path = %path.display(), "wrote latency baseline");
    Ok(path)
}

/// Outcome of one regression check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionCheck {
    pub has_regression: bool,
    /// One human-readable line per regressed metric.
    pub warnings: Vec<String>,
}

/// Compares live measurements against stored baselines.
///
/// Baselines are loaded lazily, once, on the first check.
#[derive(Debug)]
pub struct RegressionGuard {
    baseline_dir: Option<PathBuf>,
    baselines: OnceLock<HashMap<Profile, BaselineRecord>>,
    sink: Arc<dyn EventSink>,
}

impl RegressionGuard {
    /// Creates a guard that reads baselines from `baseline_dir` on first use.
    pub fn new(baseline_dir: impl Into<PathBuf>) -> Self {
        Self {
            baseline_dir: Some(baseline_dir.into()),
            baselines: OnceLock::new(),
            sink: Arc::new(TracingSink::new()),
        }
    }

    /// Creates a guard over baselines already in memory.
    pub fn with_baselines(baselines: HashMap<Profile, BaselineRecord>) -> Self {
        Self {
            baseline_dir: None,
            baselines: OnceLock::from(baselines),
            sink: Arc::new(TracingSink::new()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the baseline for `profile`, loading all baselines on first call.
    pub fn baseline(&self, profile: Profile) -> Option<BaselineRecord> {
        self.baselines().get(&profile).copied()
    }

    /// Flags first-token latency more than 15% over baseline and total
    /// latency more than 20% over baseline.
    pub fn check_regression(
        &self,
        profile: Profile,
        first_token_ms: f64,
        total_response_ms: f64,
    ) -> RegressionCheck {
        let Some(baseline) = self.baseline(profile) else {
            self.sink.emit(&LatencyEvent::BaselineMissing { profile });
            return RegressionCheck::default();
        };

        let mut check = RegressionCheck::default();
        let comparisons = [
            (
                LatencyMetric::FirstToken,
                first_token_ms,
                baseline.first_token_ms,
                FIRST_TOKEN_REGRESSION_FACTOR,
            ),
            (
                LatencyMetric::TotalResponse,
                total_response_ms,
                baseline.total_response_ms,
                TOTAL_RESPONSE_REGRESSION_FACTOR,
            ),
        ];

        for (metric, current_ms, baseline_ms, factor) in comparisons {
            // A non-positive baseline carries no information to compare against.
            if baseline_ms <= 0.0 || current_ms <= baseline_ms * factor {
                continue;
            }
            let percent_slower = (current_ms / baseline_ms - 1.0) * 100.0;
            let message = format!(
                "{metric} latency regression on {profile}: {current_ms:.0}ms vs baseline \
                 {baseline_ms:.0}ms (+{percent_slower:.1}%, limit +{:.0}%)",
                (factor - 1.0) * 100.0
            );
            self.sink.emit(&LatencyEvent::RegressionDetected {
                profile,
                metric,
                current_ms,
                baseline_ms,
                percent_slower,
                message: message.clone(),
            });
            check.has_regression = true;
            check.warnings.push(message);
        }

        check
    }

    fn baselines(&self) -> &HashMap<Profile, BaselineRecord> {
        self.baselines.get_or_init(|| match &self.baseline_dir {
            Some(dir) => load_all(dir),
            None => HashMap::new(),
        })
    }
}

fn load_all(dir: &Path) -> HashMap<Profile, BaselineRecord> {
    let mut out = HashMap::new();
    for profile in Profile::ALL {
        match load_baseline(dir, profile) {
            Ok(Some(record)) => {
                out.insert(profile, record);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    %profile,
                    error = %e,
                    "unreadable latency baseline, treating as missing"
                );
            }
        }
    }
    tracing::debug!(dir = %dir.display(), loaded = out.len(), "loaded latency baselines");
    out
}
