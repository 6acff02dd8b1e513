//! Configuration loading from file and environment variables.

use std::sync::Arc;

use argo_types::{Budget, ParseProfileError, Profile};
use serde::Deserialize;
use thiserror::Error;

use crate::controller::LatencyController;
use crate::event::TracingSink;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Latency profile and pacing settings.
    #[serde(default)]
    pub latency: LatencyConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Regression guard settings.
    #[serde(default)]
    pub regression: RegressionConfig,

    /// Stage aggregator settings.
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Latency profile and pacing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LatencyConfig {
    /// Active profile.
    #[serde(default)]
    pub profile: Profile,

    /// Advisory cap on any single intentional delay.
    #[serde(default = "default_max_intentional_delay_ms")]
    pub max_intentional_delay_ms: u64,

    /// Overrides the active profile's stream chunk delay (ignored under FAST).
    #[serde(default)]
    pub stream_chunk_delay_ms: Option<u64>,

    /// Logs every checkpoint at INFO instead of DEBUG.
    #[serde(default)]
    pub log_latency: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "argo_latency=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Regression guard configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegressionConfig {
    /// Directory holding `latency_baseline_<PROFILE>.json` files.
    #[serde(default = "default_baseline_dir")]
    pub baseline_dir: String,
}

/// Stage aggregator configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsConfig {
    /// Maximum samples retained per stage. Unbounded when absent.
    #[serde(default)]
    pub max_samples_per_stage: Option<usize>,
}

fn default_max_intentional_delay_ms() -> u64 {
    1200
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_baseline_dir() -> String {
    "latency_baselines".to_string()
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            max_intentional_delay_ms: default_max_intentional_delay_ms(),
            stream_chunk_delay_ms: None,
            log_latency: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            baseline_dir: default_baseline_dir(),
        }
    }
}

impl LatencyConfig {
    /// Resolves the effective budget for the configured profile.
    ///
    /// The stream chunk override never applies to FAST, whose pacing delay
    /// is always zero.
    pub fn budget(&self) -> Budget {
        let budget = Budget::default_for(self.profile);
        match self.stream_chunk_delay_ms {
            Some(delay) if self.profile != Profile::Fast => budget.with_stream_chunk_delay(delay),
            _ => budget,
        }
    }

    /// Builds a controller for one interaction using this configuration.
    pub fn controller(&self) -> LatencyController {
        LatencyController::builder(self.profile)
            .budget(self.budget())
            .max_intentional_delay_ms(self.max_intentional_delay_ms)
            .sink(Arc::new(TracingSink::verbose(self.log_latency)))
            .build()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// `ARGO_LATENCY_PROFILE` names no known profile.
    #[error("invalid ARGO_LATENCY_PROFILE: {0}")]
    UnknownProfile(#[from] ParseProfileError),
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides (see [`apply_env_overrides`]).
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if `ARGO_LATENCY_PROFILE` is set to an unknown profile.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Applies environment overrides read through `lookup`.
///
/// - `ARGO_LATENCY_PROFILE` overrides `latency.profile` (unknown values are an error)
/// - `ARGO_MAX_INTENTIONAL_DELAY_MS` overrides `latency.max_intentional_delay_ms`
/// - `ARGO_STREAM_CHUNK_DELAY_MS` overrides `latency.stream_chunk_delay_ms`
/// - `ARGO_LOG_LATENCY` overrides `latency.log_latency`
/// - `ARGO_LOG_LEVEL` overrides `logging.level`
/// - `ARGO_LOG_JSON` overrides `logging.json`
/// - `ARGO_BASELINE_DIR` overrides `regression.baseline_dir`
/// - `ARGO_MAX_SAMPLES_PER_STAGE` overrides `stats.max_samples_per_stage`
///
/// Numeric values that fail to parse are ignored with a warning.
///
/// # Errors
///
/// Returns `ConfigError::UnknownProfile` for an unrecognised profile name.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(profile) = lookup("ARGO_LATENCY_PROFILE") {
        config.latency.profile = profile.parse()?;
    }
    if let Some(value) = lookup("ARGO_MAX_INTENTIONAL_DELAY_MS") {
        if let Some(parsed) = parse_number("ARGO_MAX_INTENTIONAL_DELAY_MS", &value) {
            config.latency.max_intentional_delay_ms = parsed;
        }
    }
    if let Some(value) = lookup("ARGO_STREAM_CHUNK_DELAY_MS") {
        if let Some(parsed) = parse_number("ARGO_STREAM_CHUNK_DELAY_MS", &value) {
            config.latency.stream_chunk_delay_ms = Some(parsed);
        }
    }
    if let Some(value) = lookup("ARGO_LOG_LATENCY") {
        config.latency.log_latency = parse_flag(&value);
    }
    if let Some(level) = lookup("ARGO_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(value) = lookup("ARGO_LOG_JSON") {
        config.logging.json = parse_flag(&value);
    }
    if let Some(dir) = lookup("ARGO_BASELINE_DIR") {
        config.regression.baseline_dir = dir;
    }
    if let Some(value) = lookup("ARGO_MAX_SAMPLES_PER_STAGE") {
        if let Some(parsed) = parse_number("ARGO_MAX_SAMPLES_PER_STAGE", &value) {
            config.stats.max_samples_per_stage = Some(parsed);
        }
    }

    Ok(config)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value, "ignoring non-numeric environment override");
            None
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
