//! Offline analysis of aggregate measurement files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use argo_latency::{BudgetCheck, BudgetEnforcer, ComplianceReport, RegressionCheck, RegressionGuard};
use argo_stats::{load_snapshot, StageAggregator};
use argo_types::{BaselineRecord, Budget, Profile};

/// Merges every readable file into `aggregator`. Returns how many were used.
pub fn merge_files(aggregator: &StageAggregator, files: &[PathBuf]) -> usize {
    let mut loaded = 0;
    for path in files {
        match load_snapshot(path) {
            Ok(snapshot) => {
                aggregator.merge_snapshot(&snapshot);
                loaded += 1;
                tracing::info!(
                    path = %path.display(),
                    interactions = snapshot.total_interactions,
                    "merged measurement file"
                );
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "skipping measurement file");
            }
        }
    }
    loaded
}

/// Per-stage coefficient of variation and outliers.
pub fn render_variability(aggregator: &StageAggregator) -> String {
    let mut out = String::new();
    for stage in aggregator.stage_names() {
        let cv = match aggregator.coefficient_of_variation(&stage) {
            Some(cv) => format!("{cv:.1}%"),
            None => "n/a".to_string(),
        };
        let outliers = aggregator.detect_outliers(&stage);
        let _ = write!(out, "{stage:<16}cv={cv:<9}");
        if outliers.is_empty() {
            let _ = writeln!(out, "outliers=none");
        } else {
            let listed: Vec<String> = outliers.iter().map(|o| format!("{o:.1}")).collect();
            let _ = writeln!(out, "outliers=[{}]", listed.join(", "));
        }
    }
    out
}

/// Checks the derived medians against the profile budget.
pub fn check_budget(profile: Profile, budget: Budget, baseline: &BaselineRecord) -> ComplianceReport {
    BudgetEnforcer::with_budget(profile, budget)
        .check_all(baseline.first_token_ms, baseline.total_response_ms)
}

pub fn render_compliance(report: &ComplianceReport) -> String {
    fn line(out: &mut String, label: &str, check: &BudgetCheck) {
        let _ = writeln!(
            out,
            "{label:<16}{:>9.1} ms / {:>6} ms  {}",
            check.elapsed_ms, check.budget_ms, check.status
        );
    }

    let mut out = String::new();
    let _ = writeln!(out, "budget compliance ({})", report.profile);
    line(&mut out, "first-token", &report.first_token);
    line(&mut out, "total-response", &report.total);
    out
}

/// Compares the derived medians with the stored baseline for `profile`.
pub fn check_regression(
    baseline_dir: &Path,
    profile: Profile,
    current: &BaselineRecord,
) -> RegressionCheck {
    RegressionGuard::new(baseline_dir).check_regression(
        profile,
        current.first_token_ms,
        current.total_response_ms,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_latency::regression::{load_baseline, save_baseline};
    use argo_types::BudgetStatus;

    fn saved_run(dir: &Path, name: &str, totals: &[f64]) -> PathBuf {
        let aggregator = StageAggregator::new();
        aggregator.begin_session();
        for &total in totals {
            aggregator.add_sample("first_token", total / 4.0);
            aggregator.add_sample("total", total);
        }
        let path = dir.join(name);
        aggregator.save_snapshot(&path).expect("should save snapshot");
        path
    }

    #[test]
    fn merge_skips_unreadable_files() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let good = saved_run(dir.path(), "good.json", &[4_000.0, 5_000.0]);
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not json").expect("should write file");
        let missing = dir.path().join("missing.json");

        let aggregator = StageAggregator::new();
        let loaded = merge_files(&aggregator, &[bad, good, missing]);

        assert_eq!(loaded, 1);
        assert_eq!(aggregator.samples("total"), vec![4_000.0, 5_000.0]);
    }

    #[test]
    fn variability_lists_outliers() {
        let aggregator = StageAggregator::new();
        for s in [10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 100.0] {
            aggregator.add_sample("llm", s);
        }
        aggregator.add_sample("stt", 0.0);

        let text = render_variability(&aggregator);
        assert!(text.contains("outliers=[100.0]"), "got:\n{text}");
        assert!(text.contains("cv=n/a"), "zero-mean stage has no cv:\n{text}");
    }

    #[test]
    fn compliance_uses_configured_budget() {
        let baseline = BaselineRecord {
            first_token_ms: 1_900.0,
            total_response_ms: 7_000.0,
        };
        let report = check_budget(Profile::Fast, Budget::default_for(Profile::Fast), &baseline);

        assert_eq!(report.first_token.status, BudgetStatus::Warn);
        assert_eq!(report.total.status, BudgetStatus::Error);
        assert!(!report.is_compliant());

        let text = render_compliance(&report);
        assert!(text.contains("FAST"));
        assert!(text.contains("ERROR"));
    }

    #[test]
    fn baseline_write_then_regression_check() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let reference = BaselineRecord {
            first_token_ms: 1_000.0,
            total_response_ms: 5_000.0,
        };
        save_baseline(dir.path(), Profile::Argo, &reference).expect("should write baseline");
        assert_eq!(
            load_baseline(dir.path(), Profile::Argo).expect("should load"),
            Some(reference)
        );

        let slower = BaselineRecord {
            first_token_ms: 1_300.0,
            total_response_ms: 5_000.0,
        };
        let check = check_regression(dir.path(), Profile::Argo, &slower);
        assert!(check.has_regression);
        assert_eq!(check.warnings.len(), 1);

        let unchanged = check_regression(dir.path(), Profile::Voice, &slower);
        assert!(!unchanged.has_regression, "VOICE has no baseline");
    }
}
