//! Shared types for the ARGO latency toolkit.
//!
//! This crate holds the data model every other ARGO crate speaks: latency
//! profiles, the SLA budget bound to each profile, the checkpoint report a
//! controller emits at the end of an interaction, and the baseline record
//! the regression guard compares against.
//!
//! No crate in the workspace depends on anything *except* `argo-types` for
//! cross-cutting type definitions.

use serde::{Deserialize, Serialize};

mod budget;
mod report;

pub use budget::Budget;
pub use report::{Checkpoint, LatencyReport, FIRST_TOKEN_CHECKPOINT};

/// Latency operating mode, chosen once per interaction.
///
/// Each profile selects one canonical [`Budget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Profile {
    /// Lowest latency, no intentional pacing.
    #[serde(rename = "FAST")]
    Fast,
    /// Balanced default.
    #[default]
    #[serde(rename = "ARGO")]
    Argo,
    /// Spoken-output mode with the longest total budget.
    #[serde(rename = "VOICE")]
    Voice,
}

impl Profile {
    /// All recognised profiles, in budget order.
    pub const ALL: [Profile; 3] = [Profile::Fast, Profile::Argo, Profile::Voice];

    /// Returns the canonical string label for this profile.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "FAST",
            Self::Argo => "ARGO",
            Self::Voice => "VOICE",
        }
    }

    /// Returns the canonical budget for this profile.
    pub fn budget(self) -> Budget {
        Budget::default_for(self)
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Profile {
    type Err = ParseProfileError;

    /// Parses a profile label. Matching ignores ASCII case and surrounding
    /// whitespace, so `"fast"` and `" FAST "` both resolve to [`Profile::Fast`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseProfileError(s.to_string()))
    }
}

/// Error returned when parsing an unknown profile name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown latency profile: {0:?} (expected FAST, ARGO or VOICE)")]
pub struct ParseProfileError(pub String);

/// The two latency metrics a budget constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyMetric {
    /// Time until the first generated output is available.
    FirstToken,
    /// Time until the whole response is complete.
    TotalResponse,
}

impl LatencyMetric {
    /// Returns a human-readable label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::FirstToken => "first-token",
            Self::TotalResponse => "total-response",
        }
    }
}

impl std::fmt::Display for LatencyMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Compliance classification produced by the budget enforcer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BudgetStatus {
    /// Comfortably within budget.
    Ok,
    /// Above 90% of the budget but not over it.
    Warn,
    /// Over budget.
    Error,
}

impl BudgetStatus {
    /// Returns the canonical label (`OK`, `WARN`, `ERROR`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Historically accepted performance for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineRecord {
    /// Accepted first-token latency in milliseconds.
    pub first_token_ms: f64,
    /// Accepted total-response latency in milliseconds.
    pub total_response_ms: f64,
}
