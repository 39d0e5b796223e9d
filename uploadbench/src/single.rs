//! Single-shot whole-object uploads.

use std::time::Duration;

use bytes::Bytes;
use indicatif::ProgressBar;
use uploadbench_storage::Storage;

use crate::config::{BenchConfig, TrialSize};
use crate::error::BenchResult;

/// Uploads `payload` as `config.runs` separate objects and returns the duration of each upload.
///
/// The first failing upload aborts the remaining runs.
pub async fn run_size<S>(
    storage: &S,
    config: &BenchConfig,
    size: TrialSize,
    payload: Bytes,
    progress: &ProgressBar,
) -> BenchResult<Vec<Duration>>
where
    S: Storage + ?Sized,
{
    let mut durations = Vec::with_capacity(config.runs);

    for run in 0..config.runs {
        let name = size.run_object_name(&config.prefix, run);
        let elapsed = storage
            .upload_object(&config.bucket, &name, payload.clone())
            .await?;

        tracing::debug!(%name, ?elapsed, "Uploaded object");
        durations.push(elapsed);
        progress.inc(1);
    }

    Ok(durations)
}
