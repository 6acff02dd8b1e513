//! Stage timer for one interaction.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::{as_millis_f64, Clock, TokioClock};

/// Name under which a finished probe reports its total duration.
pub const TOTAL_STAGE: &str = "total";

#[derive(Debug, Clone)]
struct StageTiming {
    stage: String,
    started: Duration,
    ended: Option<Duration>,
}

/// Times named pipeline stages (`stt`, `llm`, `tts`, ...) of one interaction.
///
/// Where a [`LatencyController`](crate::LatencyController) records points in
/// time, a probe records spans. Completed probes are rolled into running
/// statistics by the stage aggregator.
#[derive(Debug)]
pub struct LatencyProbe {
    clock: Arc<dyn Clock>,
    origin: Duration,
    stages: Vec<StageTiming>,
    total: Option<Duration>,
}

impl LatencyProbe {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(TokioClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let origin = clock.now();
        Self {
            clock,
            origin,
            stages: Vec::new(),
            total: None,
        }
    }

    /// Marks the start of `stage`. Restarting a stage discards its previous timing.
    pub fn begin_stage(&mut self, stage: &str) {
        let now = self.clock.now();
        match self.stages.iter_mut().find(|s| s.stage == stage) {
            Some(existing) => {
                existing.started = now;
                existing.ended = None;
            }
            None => self.stages.push(StageTiming {
                stage: stage.to_string(),
                started: now,
                ended: None,
            }),
        }
    }

    /// Marks the end of `stage` and returns its duration in milliseconds.
    ///
    /// Returns `None` if the stage was never begun.
    pub fn end_stage(&mut self, stage: &str) -> Option<f64> {
        let now = self.clock.now();
        let Some(timing) = self.stages.iter_mut().find(|s| s.stage == stage) else {
            tracing::debug!(stage, "end_stage called for a stage that was never begun");
            return None;
        };
        timing.ended = Some(now);
        Some(as_millis_f64(now.saturating_sub(timing.started)))
    }

    /// Stops the probe and returns the total duration in milliseconds.
    pub fn finish(&mut self) -> f64 {
        let total = self.clock.now().saturating_sub(self.origin);
        self.total = Some(total);
        as_millis_f64(total)
    }

    /// Returns completed stage durations in begin order, followed by
    /// `total` once the probe is finished.
    pub fn durations(&self) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = self
            .stages
            .iter()
            .filter_map(|s| {
                s.ended
                    .map(|end| (s.stage.clone(), as_millis_f64(end.saturating_sub(s.started))))
            })
            .collect();
        if let Some(total) = self.total {
            out.push((TOTAL_STAGE.to_string(), as_millis_f64(total)));
        }
        out
    }
}

impl Default for LatencyProbe {
    fn default() -> Self {
        Self::new()
    }
}
