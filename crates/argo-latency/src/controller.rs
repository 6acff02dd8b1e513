//! Per-interaction checkpoint recorder and intentional-delay mediator.
//!
//! One [`LatencyController`] is created per interaction. It records named
//! checkpoints against a monotonic start instant, decides whether pacing
//! delays fit into the remaining budget, and produces a [`LatencyReport`]
//! when the interaction ends.
//!
//! Two invariants hold for every code path:
//!
//! - an intentional delay never runs if it would push elapsed time past
//!   `total_response_max_ms`; it is skipped instead and a `DELAY_SKIPPED`
//!   event is emitted;
//! - a FAST controller never performs a stream delay, because its
//!   `stream_chunk_delay_ms` is pinned to zero and zero-length delays
//!   return before suspending.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use argo_types::{Budget, Checkpoint, LatencyReport, Profile, FIRST_TOKEN_CHECKPOINT};

use crate::clock::{as_millis_f64, Clock, TokioClock};
use crate::error::LatencyError;
use crate::event::{EventSink, LatencyEvent, TracingSink};

/// Elapsed time after which callers should tell the user the request is
/// still being worked on. Independent of profile.
pub const STATUS_THRESHOLD_MS: f64 = 3_000.0;

/// Label used for pacing delays between streamed chunks.
pub const STREAM_CHUNK_LABEL: &str = "stream_chunk";

/// Records checkpoints and mediates intentional delays for one interaction.
///
/// The controller uses interior mutability so it can be shared as
/// `Arc<LatencyController>` between the tasks serving a single interaction.
/// Calling [`report`](Self::report) never mutates it; logging checkpoints
/// after reporting is a caller error that is not prevented.
#[derive(Debug)]
pub struct LatencyController {
    profile: Profile,
    budget: Budget,
    max_intentional_delay_ms: Option<u64>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    start: Duration,
    checkpoints: Mutex<Vec<Checkpoint>>,
    had_intentional_delays: AtomicBool,
}

impl LatencyController {
    /// Creates a controller for `profile` with its canonical budget, a tokio
    /// clock and the tracing sink.
    pub fn new(profile: Profile) -> Self {
        Self::builder(profile).build()
    }

    /// Creates a controller from a profile label.
    ///
    /// # Errors
    ///
    /// Returns `LatencyError::UnknownProfile` if `name` is not one of
    /// FAST, ARGO or VOICE. Nothing is constructed in that case.
    pub fn from_profile_name(name: &str) -> Result<Self, LatencyError> {
        let profile: Profile = name.parse()?;
        Ok(Self::new(profile))
    }

    /// Starts building a controller with non-default collaborators.
    pub fn builder(profile: Profile) -> ControllerBuilder {
        ControllerBuilder::new(profile)
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Milliseconds since the controller was created.
    pub fn elapsed_ms(&self) -> f64 {
        as_millis_f64(self.clock.now().saturating_sub(self.start))
    }

    /// Records `name` at the current elapsed time and returns that value.
    ///
    /// Logging the same name twice overwrites the earlier value in place.
    pub fn log_checkpoint(&self, name: &str) -> f64 {
        let elapsed_ms = self.elapsed_ms();
        {
            let mut checkpoints = self.lock_checkpoints();
            match checkpoints.iter_mut().find(|c| c.name == name) {
                Some(existing) => existing.elapsed_ms = elapsed_ms,
                None => checkpoints.push(Checkpoint {
                    name: name.to_string(),
                    elapsed_ms,
                }),
            }
        }
        self.sink.emit(&LatencyEvent::CheckpointLogged {
            profile: self.profile,
            name: name.to_string(),
            elapsed_ms,
        });
        elapsed_ms
    }

    /// Returns the elapsed value recorded for `name`, if any.
    pub fn checkpoint(&self, name: &str) -> Option<f64> {
        self.lock_checkpoints()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.elapsed_ms)
    }

    /// Whether any intentional delay has actually been performed.
    pub fn had_intentional_delays(&self) -> bool {
        self.had_intentional_delays.load(Ordering::Acquire)
    }

    /// Suspends the calling task for `requested_ms` if it fits into the
    /// remaining total budget, and returns the delay actually applied.
    ///
    /// A configured cap is applied first, and the skip decision compares
    /// the capped value with the remaining budget. A request larger than
    /// the remaining budget can therefore still run at the cap length.
    ///
    /// Returns 0 without suspending when the capped request is zero or
    /// larger than the remaining budget.
    pub async fn apply_intentional_delay(&self, label: &str, requested_ms: u64) -> u64 {
        let delay_ms = self.plan_delay(label, requested_ms);
        if delay_ms == 0 {
            return 0;
        }
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        self.finish_delay(label, delay_ms);
        delay_ms
    }

    /// Blocking variant of [`apply_intentional_delay`](Self::apply_intentional_delay)
    /// for threaded hosts. Blocks only the calling thread.
    pub fn apply_intentional_delay_blocking(&self, label: &str, requested_ms: u64) -> u64 {
        let delay_ms = self.plan_delay(label, requested_ms);
        if delay_ms == 0 {
            return 0;
        }
        std::thread::sleep(Duration::from_millis(delay_ms));
        self.finish_delay(label, delay_ms);
        delay_ms
    }

    /// Applies the budget's stream chunk delay. A no-op under FAST.
    pub async fn apply_stream_delay(&self) {
        self.apply_intentional_delay(STREAM_CHUNK_LABEL, self.budget.stream_chunk_delay_ms)
            .await;
    }

    /// Blocking variant of [`apply_stream_delay`](Self::apply_stream_delay).
    pub fn apply_stream_delay_blocking(&self) {
        self.apply_intentional_delay_blocking(STREAM_CHUNK_LABEL, self.budget.stream_chunk_delay_ms);
    }

    /// Emits `FIRST_TOKEN_OVER_BUDGET` if the `first_token_received`
    /// checkpoint exceeds the first-token budget. Never fails.
    pub fn check_first_token_latency(&self) {
        let Some(elapsed_ms) = self.checkpoint(FIRST_TOKEN_CHECKPOINT) else {
            return;
        };
        let budget_ms = self.budget.first_token_max_ms;
        if elapsed_ms > budget_ms as f64 {
            self.sink.emit(&LatencyEvent::FirstTokenOverBudget {
                profile: self.profile,
                elapsed_ms,
                budget_ms,
                overage_ms: elapsed_ms - budget_ms as f64,
            });
        }
    }

    /// Whether the interaction has run long enough that the user should
    /// get an interim status update.
    pub fn should_emit_status(&self) -> bool {
        self.elapsed_ms() > STATUS_THRESHOLD_MS
    }

    /// Takes a read-only snapshot of the interaction's timing.
    pub fn report(&self) -> LatencyReport {
        let elapsed_ms = self.elapsed_ms();
        LatencyReport {
            profile: self.profile,
            elapsed_ms,
            checkpoints: self.lock_checkpoints().clone(),
            had_intentional_delays: self.had_intentional_delays(),
            exceeded_budget: elapsed_ms > self.budget.total_response_max_ms as f64,
        }
    }

    /// Decides how long a requested delay may actually run. Returns 0 when
    /// it must not run at all.
    fn plan_delay(&self, label: &str, requested_ms: u64) -> u64 {
        let mut delay_ms = requested_ms;

        if let Some(cap_ms) = self.max_intentional_delay_ms {
            if delay_ms > cap_ms {
                self.sink.emit(&LatencyEvent::DelayCapped {
                    profile: self.profile,
                    label: label.to_string(),
                    requested_ms,
                    cap_ms,
                });
                delay_ms = cap_ms;
            }
        }

        if delay_ms == 0 {
            return 0;
        }

        let remaining_ms = self.budget.total_response_max_ms as f64 - self.elapsed_ms();
        if delay_ms as f64 > remaining_ms {
            self.sink.emit(&LatencyEvent::DelaySkipped {
                profile: self.profile,
                label: label.to_string(),
                requested_ms: delay_ms,
                remaining_ms,
            });
            return 0;
        }

        delay_ms
    }

    fn finish_delay(&self, label: &str, delay_ms: u64) {
        self.had_intentional_delays.store(true, Ordering::Release);
        self.sink.emit(&LatencyEvent::DelayApplied {
            profile: self.profile,
            label: label.to_string(),
            delay_ms,
        });
    }

    fn lock_checkpoints(&self) -> std::sync::MutexGuard<'_, Vec<Checkpoint>> {
        self.checkpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder for [`LatencyController`].
#[derive(Debug)]
pub struct ControllerBuilder {
    profile: Profile,
    budget: Budget,
    max_intentional_delay_ms: Option<u64>,
    clock: Option<Arc<dyn Clock>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl ControllerBuilder {
    fn new(profile: Profile) -> Self {
        Self {
            profile,
            budget: Budget::default_for(profile),
            max_intentional_delay_ms: None,
            clock: None,
            sink: None,
        }
    }

    /// Replaces the canonical budget. Under FAST the stream chunk delay of
    /// the replacement is ignored and stays zero.
    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Caps any single intentional delay.
    pub fn max_intentional_delay_ms(mut self, cap_ms: u64) -> Self {
        self.max_intentional_delay_ms = Some(cap_ms);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Captures the start instant and returns the controller.
    pub fn build(self) -> LatencyController {
        let mut budget = self.budget;
        if self.profile == Profile::Fast && budget.stream_chunk_delay_ms != 0 {
            tracing::warn!(
                requested_ms = budget.stream_chunk_delay_ms,
                "ignoring stream chunk delay override for FAST profile"
            );
            budget.stream_chunk_delay_ms = 0;
        }
        if !budget.is_consistent() {
            tracing::warn!(
                profile = %self.profile,
                first_token_max_ms = budget.first_token_max_ms,
                total_response_max_ms = budget.total_response_max_ms,
                "first-token budget exceeds total budget"
            );
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(TokioClock::new()) as Arc<dyn Clock>);
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingSink::new()) as Arc<dyn EventSink>);
        let start = clock.now();

        LatencyController {
            profile: self.profile,
            budget,
            max_intentional_delay_ms: self.max_intentional_delay_ms,
            clock,
            sink,
            start,
            checkpoints: Mutex::new(Vec::new()),
            had_intentional_delays: AtomicBool::new(false),
        }
    }
}
