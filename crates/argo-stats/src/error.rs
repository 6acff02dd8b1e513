//! Error types for the stage aggregator.

/// Errors that can occur while persisting or loading aggregate measurements.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// The measurement file could not be read or written.
    #[error("stats I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The measurement file could not be parsed or serialised.
    #[error("stats serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
