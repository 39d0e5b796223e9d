use std::fmt::{self, Debug};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{StorageError, StorageResult};

/// User agent string used for outgoing requests.
pub const USER_AGENT: &str = concat!("uploadbench/", env!("CARGO_PKG_VERSION"));

/// Handle to a resumable upload session.
///
/// For GCS this is the session URI returned when the session was created. Uploading the final
/// chunk completes the session; there is no explicit close.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UploadSession(String);

impl UploadSession {
    /// Creates a session handle from its raw representation.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Returns the raw session handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The state of a resumable upload session as reported by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResumeOffset {
    /// Number of bytes the server has durably received.
    pub offset: u64,
    /// Whether the server considers the upload finalized.
    pub is_final: bool,
}

/// An object storage backend that uploads can be benchmarked against.
///
/// Every upload operation returns the wall-clock time it took, so the implementation decides
/// exactly what is measured (e.g. excluding credential refreshes).
#[async_trait::async_trait]
pub trait Storage: Debug + Send + Sync {
    /// Uploads `payload` as a whole object named `name` into `bucket`.
    async fn upload_object(
        &self,
        bucket: &str,
        name: &str,
        payload: Bytes,
    ) -> StorageResult<Duration>;

    /// Opens a new resumable upload session for the object `name` in `bucket`.
    async fn new_upload_session(&self, bucket: &str, name: &str) -> StorageResult<UploadSession>;

    /// Uploads one chunk of a resumable upload, starting at byte `offset` of the object.
    ///
    /// If `is_final` is set, the chunk is the last one and the upload is finalized with a total
    /// size of `offset + payload.len()`.
    async fn upload_object_part(
        &self,
        session: &UploadSession,
        offset: u64,
        payload: Bytes,
        is_final: bool,
    ) -> StorageResult<Duration>;

    /// Queries how many bytes the server has received for `session`, and whether it is finalized.
    async fn resume_offset(&self, session: &UploadSession) -> StorageResult<ResumeOffset>;
}

/// Creates a reqwest client with required defaults.
///
/// Redirects are disabled: GCS answers `308 Resume Incomplete` to chunk uploads, which must reach
/// the caller instead of being followed.
pub fn reqwest_client() -> StorageResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|cause| StorageError::Reqwest {
            context: "failed to build http client".to_owned(),
            cause,
        })
}
