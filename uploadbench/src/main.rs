//! Measures upload throughput against Google Cloud Storage.
//!
//! Two benchmarks are available: `obj` uploads whole objects, `mobj` uploads chunks into a
//! resumable upload session. Both sweep over payload sizes and print one line per size to stdout:
//!
//! ```text
//! size=  1 MiB: mean speed=12.345 MiB/s, standard deviation=1.234567 MiB/s
//! ```
//!
//! Logs and progress are written to stderr. Credentials are discovered through the usual GCP
//! mechanisms unless `--anonymous` is passed.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::io;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressStyle};
use uploadbench::config::{DEFAULT_MAX_SIZE, DEFAULT_MIN_SIZE, DEFAULT_PREFIX, DEFAULT_RUNS};
use uploadbench::{BenchConfig, Mode, observability, sweep};
use uploadbench_storage::{DEFAULT_ENDPOINT, Gcs};
use yansi::Paint;

/// Upload throughput benchmark for object storage.
#[derive(Debug, FromArgs)]
struct Args {
    /// storage endpoint [default: https://storage.googleapis.com]
    #[argh(option, default = "DEFAULT_ENDPOINT.to_owned()")]
    endpoint: String,

    /// send unauthenticated requests, e.g. to a local emulator
    #[argh(switch)]
    anonymous: bool,

    /// number of uploads per size [default: 16]
    #[argh(option, default = "DEFAULT_RUNS")]
    runs: usize,

    /// first payload size and throughput unit [default: 1MiB]
    #[argh(option, default = "ByteSize::b(DEFAULT_MIN_SIZE)")]
    min_size: ByteSize,

    /// last payload size [default: 128MiB]
    #[argh(option, default = "ByteSize::b(DEFAULT_MAX_SIZE)")]
    max_size: ByteSize,

    /// prefix of the created object names [default: x]
    #[argh(option, default = "DEFAULT_PREFIX.to_owned()")]
    prefix: String,

    #[argh(subcommand)]
    command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Obj(ObjCommand),
    Mobj(MobjCommand),
}

/// benchmark single-shot uploads of whole objects
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "obj")]
struct ObjCommand {
    /// destination bucket
    #[argh(option, short = 'b')]
    bucket: Option<String>,
}

/// benchmark chunked uploads into resumable upload sessions
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "mobj")]
struct MobjCommand {
    /// destination bucket
    #[argh(option, short = 'b')]
    bucket: Option<String>,
}

fn main() -> Result<()> {
    let Args {
        endpoint,
        anonymous,
        runs,
        min_size,
        max_size,
        prefix,
        command,
    } = argh::from_env();

    observability::initialize_tracing();

    let (mode, bucket) = match command {
        Command::Obj(ObjCommand { bucket }) => (Mode::SingleShot, bucket),
        Command::Mobj(MobjCommand { bucket }) => (Mode::Resumable, bucket),
    };
    let config = BenchConfig {
        bucket: bucket.unwrap_or_default(),
        prefix,
        runs,
        min_size: min_size.as_u64(),
        max_size: max_size.as_u64(),
    };

    // Reject bad arguments before credentials are loaded.
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let storage = if anonymous {
            Gcs::anonymous(endpoint)?
        } else {
            Gcs::new(endpoint).await?
        };
        tracing::debug!(?storage, ?config);

        eprintln!(
            "{} {} (bucket: {}, runs: {})",
            "##".bold(),
            mode.name().bold().blue(),
            config.bucket.bold(),
            config.runs.bold()
        );

        let total_runs = config.sizes().count() * config.runs;
        let progress = ProgressBar::new(total_runs as u64)
            .with_style(ProgressStyle::with_template(
                "{spinner} size={msg} {wide_bar} {pos}/{len} {elapsed}",
            )?);
        progress.enable_steady_tick(Duration::from_millis(100));

        let result = sweep::run(&storage, &config, mode, &mut io::stdout(), &progress).await;
        progress.finish_and_clear();

        result?;
        anyhow::Ok(())
    })
}
