//! Checkpoint and report shapes emitted by a latency controller.

use serde::{Deserialize, Serialize};

use crate::Profile;

/// Checkpoint name marking the arrival of the first generated token.
pub const FIRST_TOKEN_CHECKPOINT: &str = "first_token_received";

/// A named event with its elapsed time since the controller started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint name, unique within one controller.
    pub name: String,
    /// Milliseconds since the controller's start instant.
    pub elapsed_ms: f64,
}

/// Read-only snapshot of one interaction's timing.
///
/// Serialises to:
///
/// ```json
/// { "profile": "ARGO", "elapsed_ms": 8000.0,
///   "checkpoints": { "input_received": 10.0, "first_token_received": 2600.0 },
///   "had_intentional_delays": false, "exceeded_budget": false }
/// ```
///
/// Checkpoints keep the order in which they were logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyReport {
    /// Profile the interaction ran under.
    pub profile: Profile,
    /// Milliseconds since start at the moment the report was taken.
    pub elapsed_ms: f64,
    /// Logged checkpoints in log order.
    #[serde(with = "checkpoint_map")]
    pub checkpoints: Vec<Checkpoint>,
    /// Whether at least one intentional delay was actually applied.
    pub had_intentional_delays: bool,
    /// Whether `elapsed_ms` was over the profile's total response budget.
    pub exceeded_budget: bool,
}

impl LatencyReport {
    /// Returns the elapsed value recorded for `name`, if any.
    pub fn checkpoint(&self, name: &str) -> Option<f64> {
        self.checkpoints
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.elapsed_ms)
    }

    /// Returns the `first_token_received` checkpoint, if logged.
    pub fn first_token_ms(&self) -> Option<f64> {
        self.checkpoint(FIRST_TOKEN_CHECKPOINT)
    }
}

/// Serialises a checkpoint list as a JSON object while keeping insertion order.
mod checkpoint_map {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::Checkpoint;

    pub fn serialize<S: Serializer>(checkpoints: &[Checkpoint], s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(checkpoints.len()))?;
        for cp in checkpoints {
            map.serialize_entry(&cp.name, &cp.elapsed_ms)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Checkpoint>, D::Error> {
        struct CheckpointVisitor;

        impl<'de> Visitor<'de> for CheckpointVisitor {
            type Value = Vec<Checkpoint>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of checkpoint name to elapsed milliseconds")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out: Vec<Checkpoint> = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, elapsed_ms)) = access.next_entry::<String, f64>()? {
                    match out.iter_mut().find(|c| c.name == name) {
                        Some(existing) => existing.elapsed_ms = elapsed_ms,
                        None => out.push(Checkpoint { name, elapsed_ms }),
                    }
                }
                Ok(out)
            }
        }

        d.deserialize_map(CheckpointVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> LatencyReport {
        LatencyReport {
            profile: Profile::Argo,
            elapsed_ms: 8000.0,
            checkpoints: vec![
                Checkpoint {
                    name: "processing_complete".to_string(),
                    elapsed_ms: 7990.0,
                },
                Checkpoint {
                    name: "first_token_received".to_string(),
                    elapsed_ms: 2600.0,
                },
            ],
            had_intentional_delays: false,
            exceeded_budget: false,
        }
    }

    #[test]
    fn report_json_shape() {
        let value = serde_json::to_value(sample_report()).expect("should serialize");
        assert_eq!(value["profile"], "ARGO");
        assert_eq!(value["elapsed_ms"], 8000.0);
        assert_eq!(value["checkpoints"]["first_token_received"], 2600.0);
        assert_eq!(value["had_intentional_delays"], false);
        assert_eq!(value["exceeded_budget"], false);
    }

    #[test]
    fn checkpoints_keep_log_order_through_json() {
        let json = serde_json::to_string(&sample_report()).expect("should serialize");
        let restored: LatencyReport = serde_json::from_str(&json).expect("should deserialize");
        let names: Vec<&str> = restored.checkpoints.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["processing_complete", "first_token_received"]);
    }

    #[test]
    fn checkpoint_lookup() {
        let report = sample_report();
        assert_eq!(report.first_token_ms(), Some(2600.0));
        assert_eq!(report.checkpoint("missing"), None);
    }
}
