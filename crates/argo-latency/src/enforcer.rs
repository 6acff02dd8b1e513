//! Budget compliance classification.

use std::sync::Arc;

use argo_types::{Budget, BudgetStatus, LatencyMetric, LatencyReport, Profile};
use serde::{Deserialize, Serialize};

use crate::error::LatencyError;
use crate::event::{EventSink, LatencyEvent, TracingSink};

/// Fraction of a budget above which a measurement is classified `WARN`.
pub const WARN_FRACTION: f64 = 0.9;

/// One metric checked against its budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetCheck {
    pub elapsed_ms: f64,
    pub budget_ms: u64,
    pub status: BudgetStatus,
}

/// Both metrics of one interaction checked against its profile's budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub profile: Profile,
    pub first_token: BudgetCheck,
    pub total: BudgetCheck,
}

impl ComplianceReport {
    /// `true` unless either metric is over budget.
    pub fn is_compliant(&self) -> bool {
        self.first_token.status != BudgetStatus::Error && self.total.status != BudgetStatus::Error
    }
}

/// Classifies measurements as OK, WARN (over 90% of budget) or ERROR (over
/// budget).
///
/// Purely observational: WARN and ERROR are reported to the sink and
/// returned, never raised.
#[derive(Debug, Clone)]
pub struct BudgetEnforcer {
    profile: Profile,
    budget: Budget,
    sink: Arc<dyn EventSink>,
}

impl BudgetEnforcer {
    pub fn new(profile: Profile) -> Self {
        Self::with_budget(profile, Budget::default_for(profile))
    }

    /// # Errors
    ///
    /// Returns `LatencyError::UnknownProfile` for anything other than
    /// FAST, ARGO or VOICE.
    pub fn from_profile_name(name: &str) -> Result<Self, LatencyError> {
        let profile: Profile = name.parse()?;
        Ok(Self::new(profile))
    }

    pub fn with_budget(profile: Profile, budget: Budget) -> Self {
        Self {
            profile,
            budget,
            sink: Arc::new(TracingSink::new()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn check_first_token(&self, elapsed_ms: f64) -> BudgetStatus {
        self.classify(
            LatencyMetric::FirstToken,
            elapsed_ms,
            self.budget.first_token_max_ms,
        )
    }

    pub fn check_total_response(&self, elapsed_ms: f64) -> BudgetStatus {
        self.classify(
            LatencyMetric::TotalResponse,
            elapsed_ms,
            self.budget.total_response_max_ms,
        )
    }

    pub fn check_all(&self, first_token_ms: f64, total_response_ms: f64) -> ComplianceReport {
        ComplianceReport {
            profile: self.profile,
            first_token: BudgetCheck {
                elapsed_ms: first_token_ms,
                budget_ms: self.budget.first_token_max_ms,
                status: self.check_first_token(first_token_ms),
            },
            total: BudgetCheck {
                elapsed_ms: total_response_ms,
                budget_ms: self.budget.total_response_max_ms,
                status: self.check_total_response(total_response_ms),
            },
        }
    }

    /// Checks a controller report. A missing `first_token_received`
    /// checkpoint counts as 0ms.
    pub fn check_report(&self, report: &LatencyReport) -> ComplianceReport {
        self.check_all(report.first_token_ms().unwrap_or(0.0), report.elapsed_ms)
    }

    fn classify(&self, metric: LatencyMetric, elapsed_ms: f64, budget_ms: u64) -> BudgetStatus {
        let limit = budget_ms as f64;
        if elapsed_ms > limit {
            self.sink.emit(&LatencyEvent::BudgetExceeded {
                profile: self.profile,
                metric,
                elapsed_ms,
                budget_ms,
            });
            BudgetStatus::Error
        } else if elapsed_ms > WARN_FRACTION * limit {
            self.sink.emit(&LatencyEvent::BudgetWarning {
                profile: self.profile,
                metric,
                elapsed_ms,
                budget_ms,
                percent_of_budget: elapsed_ms / limit * 100.0,
            });
            BudgetStatus::Warn
        } else {
            BudgetStatus::Ok
        }
    }
}
