//! Error types for the latency core.

use argo_types::ParseProfileError;

/// Errors that can occur in the latency core.
///
/// Telemetry operations never return these on the happy path; the only
/// hard failure a caller sees during an interaction is an unknown profile
/// at construction time.
#[derive(Debug, thiserror::Error)]
pub enum LatencyError {
    /// The profile name is not FAST, ARGO or VOICE.
    #[error("configuration error: {0}")]
    UnknownProfile(#[from] ParseProfileError),

    /// A baseline file could not be read or written.
    #[error("baseline I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A baseline file could not be parsed or serialised.
    #[error("baseline serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
