//! Logging setup for the benchmark binary.

use std::env;

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Installs a global subscriber that logs to stderr, keeping stdout for the report.
pub fn initialize_tracing() {
    let (level, env_filter) = parse_rust_log(env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    let format = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(format.with_filter(LevelFilter::from(level)))
        .with(env_filter)
        .init();
}

/// Interprets the value of `RUST_LOG`.
///
/// A plain level such as `debug` sets the verbosity of the benchmark itself, while dependencies
/// stay at `INFO` or quieter. Any other value is used literally as an [`EnvFilter`].
pub fn parse_rust_log(value: Option<&str>) -> (Level, EnvFilter) {
    let level = match value {
        Some(value) => match value.parse::<Level>() {
            Ok(level) => level,
            Err(_) => return (Level::TRACE, EnvFilter::new(value)),
        },
        None => Level::INFO,
    };

    // This is the maximum verbosity that will be logged, we filter this down to `level`.
    let env_filter = EnvFilter::new(
        "INFO,\
        hyper_util=WARN,\
        reqwest=WARN,\
        uploadbench=TRACE,\
        uploadbench_storage=TRACE,\
        ",
    );

    (level, env_filter)
}
