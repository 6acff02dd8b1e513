//! Latency instrumentation and budget enforcement for the ARGO voice pipeline.
//!
//! The pipeline creates one [`LatencyController`] per interaction, tagged
//! with a [`Profile`](argo_types::Profile). Stages log checkpoints on it as
//! they complete, pacing code asks it for intentional delays, and at the end
//! its [`report`](LatencyController::report) is handed to the
//! [`BudgetEnforcer`] and to the stage aggregator in `argo-stats`.
//! The [`RegressionGuard`] runs independently against stored baselines.
//!
//! # Failure policy
//!
//! Everything here is advisory telemetry. Apart from constructing a
//! controller or enforcer from an unknown profile name, no operation fails:
//! budget overruns, skipped delays and regressions surface as
//! [`LatencyEvent`]s and as fields of the returned reports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use argo_latency::{context, BudgetEnforcer, LatencyController};
//! use argo_types::Profile;
//!
//! let controller = Arc::new(LatencyController::new(Profile::Argo));
//! context::scope(controller.clone(), async {
//!     context::log_checkpoint("input_received");
//!     // ... stream tokens, calling controller.apply_stream_delay().await
//! })
//! .await;
//!
//! let report = controller.report();
//! let compliance = BudgetEnforcer::new(report.profile).check_report(&report);
//! ```

pub mod clock;
pub mod config;
pub mod context;
mod controller;
mod enforcer;
mod error;
mod event;
mod probe;
pub mod regression;

pub use clock::{Clock, ManualClock, TokioClock};
pub use controller::{ControllerBuilder, LatencyController, STATUS_THRESHOLD_MS, STREAM_CHUNK_LABEL};
pub use enforcer::{BudgetCheck, BudgetEnforcer, ComplianceReport, WARN_FRACTION};
pub use error::LatencyError;
pub use event::{EventLevel, EventSink, LatencyEvent, MemorySink, TracingSink};
pub use probe::{LatencyProbe, TOTAL_STAGE};
pub use regression::{RegressionCheck, RegressionGuard};
