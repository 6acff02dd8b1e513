use std::collections::HashMap;
use std::sync::Arc;

use argo_latency::regression::{baseline_path, load_baseline, save_baseline};
use argo_latency::{LatencyEvent, MemorySink, RegressionGuard};
use argo_types::{BaselineRecord, LatencyMetric, Profile};

fn baseline(first_token_ms: f64, total_response_ms: f64) -> BaselineRecord {
    BaselineRecord {
        first_token_ms,
        total_response_ms,
    }
}

#[test]
fn missing_baseline_reports_no_regression() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let sink = Arc::new(MemorySink::new());
    let guard = RegressionGuard::new(dir.path().join("does-not-exist")).with_sink(sink.clone());

    let check = guard.check_regression(Profile::Argo, 99_999.0, 99_999.0);

    assert!(!check.has_regression);
    assert!(check.warnings.is_empty());
    assert_eq!(sink.count("BASELINE_MISSING"), 1);
}

#[test]
fn first_token_threshold_is_fifteen_percent() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    save_baseline(dir.path(), Profile::Argo, &baseline(1_000.0, 5_000.0))
        .expect("should save baseline");
    let guard = RegressionGuard::new(dir.path());

    let check = guard.check_regression(Profile::Argo, 1_140.0, 5_000.0);
    assert!(!check.has_regression, "14% slower is within threshold");

    let check = guard.check_regression(Profile::Argo, 1_200.0, 5_000.0);
    assert!(check.has_regression, "20% slower exceeds 15% threshold");
    assert_eq!(check.warnings.len(), 1);
    assert!(check.warnings[0].contains("first-token"), "got: {}", check.warnings[0]);
}

#[test]
fn total_threshold_is_twenty_percent() {
    let mut baselines = HashMap::new();
    baselines.insert(Profile::Voice, baseline(1_000.0, 5_000.0));
    let sink = Arc::new(MemorySink::new());
    let guard = RegressionGuard::with_baselines(baselines).with_sink(sink.clone());

    assert!(!guard.check_regression(Profile::Voice, 1_000.0, 5_900.0).has_regression);

    let check = guard.check_regression(Profile::Voice, 1_000.0, 6_100.0);
    assert!(check.has_regression);
    assert_eq!(check.warnings.len(), 1);

    match sink.events().last() {
        Some(LatencyEvent::RegressionDetected {
            metric,
            percent_slower,
            ..
        }) => {
            assert_eq!(*metric, LatencyMetric::TotalResponse);
            assert!((percent_slower - 22.0).abs() < 1e-9);
        }
        other => panic!("expected RegressionDetected, got {other:?}"),
    }
}

#[test]
fn both_metrics_can_regress_together() {
    let mut baselines = HashMap::new();
    baselines.insert(Profile::Fast, baseline(500.0, 2_000.0));
    let guard = RegressionGuard::with_baselines(baselines);

    let check = guard.check_regression(Profile::Fast, 1_000.0, 4_000.0);
    assert!(check.has_regression);
    assert_eq!(check.warnings.len(), 2);

    // Other profiles have no baseline.
    assert!(!guard.check_regression(Profile::Argo, 1_000.0, 4_000.0).has_regression);
}

#[test]
fn baselines_are_loaded_once() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let guard = RegressionGuard::new(dir.path());

    assert!(guard.baseline(Profile::Argo).is_none());

    save_baseline(dir.path(), Profile::Argo, &baseline(100.0, 200.0)).expect("should save");
    assert!(
        guard.baseline(Profile::Argo).is_none(),
        "baselines are memoized on first use"
    );

    let fresh = RegressionGuard::new(dir.path());
    assert_eq!(fresh.baseline(Profile::Argo), Some(baseline(100.0, 200.0)));
}

#[test]
fn malformed_baseline_is_treated_as_missing() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    std::fs::write(baseline_path(dir.path(), Profile::Voice), "{ not json")
        .expect("should write file");

    assert!(load_baseline(dir.path(), Profile::Voice).is_err());

    let guard = RegressionGuard::new(dir.path());
    let check = guard.check_regression(Profile::Voice, 50_000.0, 50_000.0);
    assert!(!check.has_regression);
}

#[test]
fn baseline_file_round_trip() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let nested = dir.path().join("nested").join("baselines");
    let path = save_baseline(&nested, Profile::Fast, &baseline(800.0, 3_000.0))
        .expect("should create directory and save");

    assert!(path.ends_with("latency_baseline_FAST.json"));
    let contents = std::fs::read_to_string(&path).expect("should read file");
    let value: serde_json::Value = serde_json::from_str(&contents).expect("should be JSON");
    assert_eq!(value["first_token_ms"], 800.0);
    assert_eq!(value["total_response_ms"], 3_000.0);
    assert_eq!(
        load_baseline(&nested, Profile::Fast).expect("should load"),
        Some(baseline(800.0, 3_000.0))
    );
}
