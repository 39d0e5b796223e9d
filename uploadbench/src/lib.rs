//! Upload throughput benchmarks for object storage.
//!
//! A benchmark sweeps over payload sizes, doubling from a minimum to a maximum size. For every
//! size, the same random payload is uploaded a fixed number of times, either as separate whole
//! objects ([`Mode::SingleShot`]) or as consecutive chunks of a single resumable upload
//! ([`Mode::Resumable`]). The durations of these runs are aggregated into a mean
//! [`Throughput`] and its standard deviation, measured in multiples of the minimum size per
//! second.
//!
//! Resumable uploads verify the resume offset reported by the server after every chunk, so
//! a benchmark never silently measures a broken upload.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod observability;
pub mod payload;
pub mod resumable;
pub mod single;
pub mod stats;
pub mod sweep;

pub use crate::config::BenchConfig;
pub use crate::error::{BenchError, BenchResult, ConfigError};
pub use crate::stats::{SizeReport, Throughput};
pub use crate::sweep::{Mode, run};
