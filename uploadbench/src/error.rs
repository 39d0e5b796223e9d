//! Error types of the benchmark drivers.

use thiserror::Error;
use uploadbench_storage::StorageError;

/// An invalid [`BenchConfig`](crate::config::BenchConfig), detected before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No destination bucket was given.
    #[error("destination bucket must be specified (--bucket)")]
    MissingBucket,

    /// The run count is zero, so there is nothing to measure.
    #[error("at least one run per size is required")]
    NoRuns,

    /// The size range of the sweep is empty.
    #[error("invalid size range: min size {min} must be positive and at most max size {max}")]
    InvalidSizeRange {
        /// The configured minimum size.
        min: u64,
        /// The configured maximum size.
        max: u64,
    },
}

/// Errors that abort a benchmark sweep.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The sweep is misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The storage failed an operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// After a chunk upload, the server reported a different resume offset than the client sent.
    #[error("unexpected offset: got {got}, want {want}")]
    OffsetMismatch {
        /// The offset reported by the server.
        got: u64,
        /// The offset tracked by the client.
        want: u64,
    },

    /// After a chunk upload, the server disagrees on whether the upload is finalized.
    #[error("unexpected final chunk flag: got {got}, want {want}")]
    FinalFlagMismatch {
        /// The flag reported by the server.
        got: bool,
        /// The flag sent by the client.
        want: bool,
    },

    /// Writing the report failed.
    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

/// Result type for benchmark operations.
pub type BenchResult<T> = Result<T, BenchError>;
