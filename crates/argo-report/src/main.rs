//! argo-report: merges aggregate latency measurement files, prints stage
//! statistics, and checks the derived medians against the configured
//! profile's budget and stored baseline.
//!
//! ```text
//! argo-report [--write-baseline] <measurement.json>...
//! ```
//!
//! Configuration is read from `ARGO_CONFIG_PATH` (default `argo.toml`),
//! with the usual `ARGO_*` environment overrides.

mod analysis;
mod cli;

use std::path::Path;
use std::process::ExitCode;

use argo_latency::config::{self, Config};
use argo_latency::regression::save_baseline;
use argo_stats::StageAggregator;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (String, &'static str) {
    if let Ok(path) = std::env::var("ARGO_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    ("argo.toml".to_string(), "default")
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> ExitCode {
    let (config_path, config_source) = resolve_config_path();

    let config = match config::load_config(Some(config_path.as_str())) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("argo-report: {e}");
            return ExitCode::from(2);
        }
    };

    init_tracing(&config);

    tracing::info!(
        source = config_source,
        path = %config_path,
        profile = %config.latency.profile,
        "resolved configuration"
    );

    let args = match cli::parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("argo-report: {e}\n{}", cli::USAGE);
            return ExitCode::from(2);
        }
    };

    let aggregator = match config.stats.max_samples_per_stage {
        Some(cap) => StageAggregator::with_sample_cap(cap),
        None => StageAggregator::new(),
    };

    if analysis::merge_files(&aggregator, &args.files) == 0 {
        tracing::error!(files = args.files.len(), "no usable measurement files");
        return ExitCode::FAILURE;
    }

    println!(
        "{} interactions across {} sessions\n",
        aggregator.interaction_count(),
        aggregator.session_count()
    );
    print!("{}", aggregator.report());
    println!();
    print!("{}", analysis::render_variability(&aggregator));

    let Some(baseline) = aggregator.baseline() else {
        tracing::warn!("no first_token and total samples; skipping budget and regression checks");
        return if args.write_baseline {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    };

    let profile = config.latency.profile;
    let compliance = analysis::check_budget(profile, config.latency.budget(), &baseline);
    println!();
    print!("{}", analysis::render_compliance(&compliance));

    let baseline_dir = Path::new(&config.regression.baseline_dir);
    let regression = analysis::check_regression(baseline_dir, profile, &baseline);
    for warning in &regression.warnings {
        println!("regression: {warning}");
    }

    if args.write_baseline {
        match save_baseline(baseline_dir, profile, &baseline) {
            Ok(path) => println!("\nbaseline written to {}", path.display()),
            Err(e) => {
                tracing::error!(error = %e, "failed to write baseline");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
