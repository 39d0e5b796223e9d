//! The storage capability used by the upload benchmarks.
//!
//! The benchmark drivers only ever talk to a [`Storage`]. It covers the four operations needed to
//! measure upload throughput: whole-object uploads, opening a resumable upload session, uploading a
//! chunk into such a session, and querying the resume offset of a session.
//!
//! [`Gcs`] implements this capability on top of the Google Cloud Storage JSON upload API.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod common;
mod error;
mod gcs;

pub use common::*;
pub use error::{StorageError, StorageResult};
pub use gcs::{DEFAULT_ENDPOINT, Gcs};
