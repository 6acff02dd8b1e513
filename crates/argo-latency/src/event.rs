//! Latency events and the sinks that receive them.
//!
//! Controllers, enforcers and regression guards never log directly. They
//! build a [`LatencyEvent`] and hand it to the [`EventSink`] they were
//! constructed with. The default [`TracingSink`] forwards events to
//! `tracing`; [`MemorySink`] keeps them for inspection.

use std::sync::{Mutex, PoisonError};

use argo_types::{LatencyMetric, Profile};
use serde::{Deserialize, Serialize};

/// Severity of a latency event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured telemetry emitted by the latency core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LatencyEvent {
    /// A checkpoint was recorded on a controller.
    CheckpointLogged {
        profile: Profile,
        name: String,
        elapsed_ms: f64,
    },

    /// An intentional delay was performed in full.
    DelayApplied {
        profile: Profile,
        label: String,
        delay_ms: u64,
    },

    /// A requested delay was reduced to the configured per-delay cap.
    DelayCapped {
        profile: Profile,
        label: String,
        requested_ms: u64,
        cap_ms: u64,
    },

    /// A requested delay would have overrun the total budget and was skipped.
    DelaySkipped {
        profile: Profile,
        label: String,
        requested_ms: u64,
        remaining_ms: f64,
    },

    /// The `first_token_received` checkpoint is over the first-token budget.
    FirstTokenOverBudget {
        profile: Profile,
        elapsed_ms: f64,
        budget_ms: u64,
        overage_ms: f64,
    },

    /// A metric consumed more than 90% of its budget.
    BudgetWarning {
        profile: Profile,
        metric: LatencyMetric,
        elapsed_ms: f64,
        budget_ms: u64,
        percent_of_budget: f64,
    },

    /// A metric went over its budget.
    BudgetExceeded {
        profile: Profile,
        metric: LatencyMetric,
        elapsed_ms: f64,
        budget_ms: u64,
    },

    /// A live measurement is slower than the stored baseline beyond the
    /// allowed threshold.
    RegressionDetected {
        profile: Profile,
        metric: LatencyMetric,
        current_ms: f64,
        baseline_ms: f64,
        percent_slower: f64,
        message: String,
    },

    /// No baseline exists for the profile; regression checks pass vacuously.
    BaselineMissing { profile: Profile },
}

impl LatencyEvent {
    /// Returns the canonical event type string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CheckpointLogged { .. } => "CHECKPOINT_LOGGED",
            Self::DelayApplied { .. } => "DELAY_APPLIED",
            Self::DelayCapped { .. } => "DELAY_CAPPED",
            Self::DelaySkipped { .. } => "DELAY_SKIPPED",
            Self::FirstTokenOverBudget { .. } => "FIRST_TOKEN_OVER_BUDGET",
            Self::BudgetWarning { .. } => "BUDGET_WARNING",
            Self::BudgetExceeded { .. } => "BUDGET_EXCEEDED",
            Self::RegressionDetected { .. } => "REGRESSION_DETECTED",
            Self::BaselineMissing { .. } => "BASELINE_MISSING",
        }
    }

    /// Returns the severity the event is logged at.
    pub fn level(&self) -> EventLevel {
        match self {
            Self::CheckpointLogged { .. }
            | Self::DelayApplied { .. }
            | Self::DelayCapped { .. }
            | Self::BaselineMissing { .. } => EventLevel::Debug,
            Self::DelaySkipped { .. }
            | Self::FirstTokenOverBudget { .. }
            | Self::BudgetWarning { .. }
            | Self::RegressionDetected { .. } => EventLevel::Warn,
            Self::BudgetExceeded { .. } => EventLevel::Error,
        }
    }

    /// Returns the profile the event belongs to.
    pub fn profile(&self) -> Profile {
        match self {
            Self::CheckpointLogged { profile, .. }
            | Self::DelayApplied { profile, .. }
            | Self::DelayCapped { profile, .. }
            | Self::DelaySkipped { profile, .. }
            | Self::FirstTokenOverBudget { profile, .. }
            | Self::BudgetWarning { profile, .. }
            | Self::BudgetExceeded { profile, .. }
            | Self::RegressionDetected { profile, .. }
            | Self::BaselineMissing { profile } => *profile,
        }
    }
}

/// Receives latency events.
///
/// Implementations must not panic and must not block for long; they run
/// inline on the interaction they observe.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    fn emit(&self, event: &LatencyEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    verbose_checkpoints: bool,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs checkpoints at INFO instead of DEBUG.
    pub fn verbose(verbose_checkpoints: bool) -> Self {
        Self {
            verbose_checkpoints,
        }
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: &LatencyEvent) {
        match event {
            LatencyEvent::CheckpointLogged {
                profile,
                name,
                elapsed_ms,
            } => {
                if self.verbose_checkpoints {
                    tracing::info!(%profile, checkpoint = %name, elapsed_ms, "latency checkpoint");
                } else {
                    tracing::debug!(%profile, checkpoint = %name, elapsed_ms, "latency checkpoint");
                }
            }
            LatencyEvent::DelayApplied {
                profile,
                label,
                delay_ms,
            } => {
                tracing::debug!(%profile, label = %label, delay_ms, "applied intentional delay");
            }
            LatencyEvent::DelayCapped {
                profile,
                label,
                requested_ms,
                cap_ms,
            } => {
                tracing::debug!(
                    %profile,
                    label = %label,
                    requested_ms,
                    cap_ms,
                    "intentional delay reduced to cap"
                );
            }
            LatencyEvent::DelaySkipped {
                profile,
                label,
                requested_ms,
                remaining_ms,
            } => {
                tracing::warn!(
                    %profile,
                    label = %label,
                    requested_ms,
                    remaining_ms,
                    "skipped {requested_ms}ms intentional delay '{label}': would exceed total budget"
                );
            }
            LatencyEvent::FirstTokenOverBudget {
                profile,
                elapsed_ms,
                budget_ms,
                overage_ms,
            } => {
                tracing::warn!(
                    %profile,
                    elapsed_ms,
                    budget_ms,
                    overage_ms,
                    "first token {overage_ms:.0}ms over budget"
                );
            }
            LatencyEvent::BudgetWarning {
                profile,
                metric,
                elapsed_ms,
                budget_ms,
                percent_of_budget,
            } => {
                tracing::warn!(
                    %profile,
                    %metric,
                    elapsed_ms,
                    budget_ms,
                    "{metric} latency at {percent_of_budget:.1}% of budget"
                );
            }
            LatencyEvent::BudgetExceeded {
                profile,
                metric,
                elapsed_ms,
                budget_ms,
            } => {
                tracing::error!(
                    %profile,
                    %metric,
                    elapsed_ms,
                    budget_ms,
                    "{metric} latency {elapsed_ms:.0}ms exceeds {budget_ms}ms budget"
                );
            }
            LatencyEvent::RegressionDetected {
                profile,
                metric,
                current_ms,
                baseline_ms,
                message,
                ..
            } => {
                tracing::warn!(%profile, %metric, current_ms, baseline_ms, "{message}");
            }
            LatencyEvent::BaselineMissing { profile } => {
                tracing::debug!(%profile, "no latency baseline, skipping regression check");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LatencyEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all events received so far.
    pub fn events(&self) -> Vec<LatencyEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many events of `event_type` were received.
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    /// Discards all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &LatencyEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
