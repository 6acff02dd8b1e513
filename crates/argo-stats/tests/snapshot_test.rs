use std::sync::Arc;
use std::thread;

use argo_stats::{load_snapshot, StageAggregator, StatsError};

fn populated() -> StageAggregator {
    let aggregator = StageAggregator::new();
    aggregator.begin_session();
    for (stt, llm) in [(300.0, 1_100.0), (320.0, 900.0), (280.0, 1_300.0)] {
        aggregator.add_sample("stt", stt);
        aggregator.add_sample("llm", llm);
    }
    aggregator
}

#[test]
fn snapshot_file_has_expected_shape() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("latency_aggregate.json");

    populated()
        .save_snapshot(&path)
        .expect("should save snapshot");

    let contents = std::fs::read_to_string(&path).expect("should read file");
    let value: serde_json::Value = serde_json::from_str(&contents).expect("should be JSON");

    assert!(value["timestamp"].is_string());
    assert!(
        chrono::DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap_or_default())
            .is_ok(),
        "timestamp should be RFC 3339"
    );
    assert_eq!(value["num_sessions"], 1);
    assert_eq!(value["total_interactions"], 0);

    let llm = &value["stages"]["llm"];
    assert_eq!(llm["count"], 3);
    assert_eq!(llm["samples"], serde_json::json!([1_100.0, 900.0, 1_300.0]));
    assert_eq!(llm["min_ms"], 900.0);
    assert_eq!(llm["max_ms"], 1_300.0);
    assert_eq!(llm["avg_ms"], 1_100.0);
    assert_eq!(llm["median_ms"], 1_100.0);
    assert!(value["stages"]["tts"].is_null(), "empty stages are omitted");
}

#[test]
fn save_then_load_restores_statistics() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("run.json");
    let original = populated();
    original.save_snapshot(&path).expect("should save snapshot");

    let snapshot = load_snapshot(&path).expect("should load snapshot");
    let restored = StageAggregator::from_snapshot(&snapshot);

    assert_eq!(restored.stats("stt"), original.stats("stt"));
    assert_eq!(restored.samples("llm"), original.samples("llm"));
    assert_eq!(restored.session_count(), 1);
}

#[test]
fn merging_snapshots_accumulates_samples_and_counters() {
    let first = populated();
    first.add_sample("total", 4_000.0);
    let second = populated();
    second.add_sample("total", 6_000.0);

    let merged = StageAggregator::new();
    merged.merge_snapshot(&first.snapshot());
    merged.merge_snapshot(&second.snapshot());

    assert_eq!(merged.samples("stt").len(), 6);
    assert_eq!(merged.samples("total"), vec![4_000.0, 6_000.0]);
    assert_eq!(merged.session_count(), 2);
}

#[test]
fn merge_recomputes_from_samples_when_count_disagrees() {
    let mut snapshot = populated().snapshot();
    if let Some(stt) = snapshot.stages.get_mut("stt") {
        stt.count = 99;
        stt.min_ms = -1.0;
    }

    let aggregator = StageAggregator::from_snapshot(&snapshot);
    let stats = aggregator.stats("stt").expect("stt has samples");
    assert_eq!(stats.count, 3);
    assert_eq!(stats.min, 280.0);
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let result = load_snapshot(&dir.path().join("missing.json"));
    assert!(matches!(result, Err(StatsError::Io(_))), "got {result:?}");
}

#[test]
fn load_malformed_file_is_serialization_error() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, r#"{"timestamp": 5}"#).expect("should write file");

    let result = load_snapshot(&path);
    assert!(matches!(result, Err(StatsError::Serialization(_))), "got {result:?}");
}

#[test]
fn concurrent_samples_are_all_recorded() {
    let aggregator = Arc::new(StageAggregator::new());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let aggregator = Arc::clone(&aggregator);
            thread::spawn(move || {
                for i in 0..250 {
                    aggregator.add_sample("llm", f64::from(worker * 1_000 + i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker should not panic");
    }

    let stats = aggregator.stats("llm").expect("llm has samples");
    assert_eq!(stats.count, 2_000);
    assert_eq!(stats.min, 0.0);
    assert_eq!(stats.max, 7_249.0);
}
