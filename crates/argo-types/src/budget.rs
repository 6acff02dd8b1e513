//! SLA budgets per latency profile.

use serde::{Deserialize, Serialize};

use crate::Profile;

/// SLA thresholds bound to one [`Profile`].
///
/// Invariant: `first_token_max_ms <= total_response_max_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Maximum acceptable time to first token.
    pub first_token_max_ms: u64,
    /// Maximum acceptable time to a complete response.
    pub total_response_max_ms: u64,
    /// Intentional pacing delay inserted between streamed chunks.
    pub stream_chunk_delay_ms: u64,
}

impl Budget {
    /// Returns the canonical budget for `profile`.
    ///
    /// | Profile | first token | total | stream chunk |
    /// |---------|-------------|-------|--------------|
    /// | FAST    | 2000        | 6000  | 0            |
    /// | ARGO    | 3000        | 10000 | 200          |
    /// | VOICE   | 3000        | 15000 | 300          |
    pub const fn default_for(profile: Profile) -> Self {
        match profile {
            Profile::Fast => Self {
                first_token_max_ms: 2_000,
                total_response_max_ms: 6_000,
                stream_chunk_delay_ms: 0,
            },
            Profile::Argo => Self {
                first_token_max_ms: 3_000,
                total_response_max_ms: 10_000,
                stream_chunk_delay_ms: 200,
            },
            Profile::Voice => Self {
                first_token_max_ms: 3_000,
                total_response_max_ms: 15_000,
                stream_chunk_delay_ms: 300,
            },
        }
    }

    /// Returns a copy with the stream chunk delay replaced.
    pub const fn with_stream_chunk_delay(mut self, delay_ms: u64) -> Self {
        self.stream_chunk_delay_ms = delay_ms;
        self
    }

    /// Returns `true` if the first-token limit does not exceed the total limit.
    pub const fn is_consistent(&self) -> bool {
        self.first_token_max_ms <= self.total_response_max_ms
    }
}
