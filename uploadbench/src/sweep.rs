//! Runs a benchmark over all sizes of the sweep and reports the results.

use std::io::Write;

use bytesize::ByteSize;
use indicatif::ProgressBar;
use uploadbench_storage::Storage;

use crate::config::BenchConfig;
use crate::error::{BenchResult, ConfigError};
use crate::stats::{SizeReport, Throughput};
use crate::{payload, resumable, single};

/// How objects are uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Every run uploads a whole object in a single request.
    SingleShot,
    /// Every run uploads one chunk of a resumable upload session.
    Resumable,
}

impl Mode {
    /// A human readable name of the mode.
    pub fn name(self) -> &'static str {
        match self {
            Mode::SingleShot => "single-shot upload",
            Mode::Resumable => "resumable upload",
        }
    }
}

/// Runs the benchmark for every size of the sweep.
///
/// One report line is written to `out` as soon as a size completes. The first error aborts the
/// sweep, leaving the lines of all previously completed sizes in `out`. The config is validated
/// before anything is sent to `storage`.
pub async fn run<S, W>(
    storage: &S,
    config: &BenchConfig,
    mode: Mode,
    out: &mut W,
    progress: &ProgressBar,
) -> BenchResult<Vec<SizeReport>>
where
    S: Storage + ?Sized,
    W: Write,
{
    config.validate()?;

    tracing::info!(
        mode = mode.name(),
        bucket = %config.bucket,
        runs = config.runs,
        min_size = %ByteSize::b(config.min_size),
        max_size = %ByteSize::b(config.max_size),
        "Starting sweep"
    );

    let mut reports = Vec::new();
    for size in config.sizes() {
        progress.set_message(format!("{} MiB", size.units));
        tracing::debug!(size = %ByteSize::b(size.bytes), "Measuring size");

        let payload = payload::random(size.bytes);
        let durations = match mode {
            Mode::SingleShot => {
                single::run_size(storage, config, size, payload, progress).await?
            }
            Mode::Resumable => {
                resumable::run_size(storage, config, size, payload, progress).await?
            }
        };

        let throughput = Throughput::from_durations(size.units as f64, &durations)
            .ok_or(ConfigError::NoRuns)?;
        let report = SizeReport {
            units: size.units,
            throughput,
        };

        progress.suspend(|| writeln!(out, "{report}").and_then(|()| out.flush()))?;
        reports.push(report);
    }

    Ok(reports)
}
