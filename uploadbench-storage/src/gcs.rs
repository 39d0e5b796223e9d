use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use gcp_auth::TokenProvider;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE, HeaderName, LOCATION, RANGE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::common::{ResumeOffset, Storage, UploadSession, reqwest_client};
use crate::error::{StorageError, StorageResult};

/// The public Google Cloud Storage endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

const SCOPES: &[&str] = &["https://www.googleapis.com/auth/devstorage.read_write"];

/// Google Cloud Storage, accessed through the JSON upload API.
pub struct Gcs {
    client: reqwest::Client,
    endpoint: String,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl Gcs {
    /// Creates a client for `endpoint` using the default GCP credential discovery.
    pub async fn new(endpoint: impl Into<String>) -> StorageResult<Self> {
        let token_provider = gcp_auth::provider().await?;
        Ok(Self {
            client: reqwest_client()?,
            endpoint: endpoint.into(),
            token_provider: Some(token_provider),
        })
    }

    /// Creates a client for `endpoint` that sends unauthenticated requests.
    ///
    /// This is meant for local emulators.
    pub fn anonymous(endpoint: impl Into<String>) -> StorageResult<Self> {
        Ok(Self {
            client: reqwest_client()?,
            endpoint: endpoint.into(),
            token_provider: None,
        })
    }

    fn upload_url(&self, bucket: &str) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        format!("{endpoint}/upload/storage/v1/b/{bucket}/o")
    }

    async fn authorize(&self, builder: RequestBuilder) -> StorageResult<RequestBuilder> {
        let Some(token_provider) = &self.token_provider else {
            return Ok(builder);
        };
        let token = token_provider.token(SCOPES).await?;
        Ok(builder.bearer_auth(token.as_str()))
    }

    /// Sends the request and reads the entire response, returning the response status, headers
    /// and body together with the elapsed time.
    async fn send_timed(
        &self,
        builder: RequestBuilder,
        context: &str,
    ) -> StorageResult<(Completed, Duration)> {
        let builder = self.authorize(builder).await?;

        let start = Instant::now();
        let response = builder.send().await.map_err(reqwest_error(context))?;
        let completed = Completed::read(response, context).await?;
        Ok((completed, start.elapsed()))
    }
}

impl fmt::Debug for Gcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gcs")
            .field("endpoint", &self.endpoint)
            .field("authenticated", &self.token_provider.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Storage for Gcs {
    #[tracing::instrument(level = "trace", skip(self, payload), fields(len = payload.len()))]
    async fn upload_object(
        &self,
        bucket: &str,
        name: &str,
        payload: Bytes,
    ) -> StorageResult<Duration> {
        let builder = self
            .client
            .post(self.upload_url(bucket))
            .query(&[("uploadType", "media"), ("name", name)])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(payload);

        let (completed, elapsed) = self.send_timed(builder, "upload object").await?;
        completed.expect_success("upload object")?;

        tracing::trace!(?elapsed, "Uploaded object");
        Ok(elapsed)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn new_upload_session(&self, bucket: &str, name: &str) -> StorageResult<UploadSession> {
        let builder = self
            .client
            .post(self.upload_url(bucket))
            .query(&[("uploadType", "resumable"), ("name", name)])
            .json(&NewObject { name });

        let (completed, _) = self.send_timed(builder, "create upload session").await?;
        let completed = completed.expect_success("create upload session")?;

        let location = completed
            .location
            .ok_or_else(|| StorageError::UnexpectedResponse("missing Location header".into()))?;

        tracing::debug!(session = %location, "Created upload session");
        Ok(UploadSession::new(location))
    }

    #[tracing::instrument(level = "trace", skip(self, session, payload), fields(len = payload.len()))]
    async fn upload_object_part(
        &self,
        session: &UploadSession,
        offset: u64,
        payload: Bytes,
        is_final: bool,
    ) -> StorageResult<Duration> {
        let content_range = content_range(offset, payload.len() as u64, is_final);
        let builder = self
            .client
            .put(session.as_str())
            .header(CONTENT_RANGE, content_range)
            .body(payload);

        let (completed, elapsed) = self.send_timed(builder, "upload object part").await?;
        // Whether the upload was finalized is checked by the caller through `resume_offset`.
        if completed.status != StatusCode::PERMANENT_REDIRECT {
            completed.expect_success("upload object part")?;
        }

        tracing::trace!(?elapsed, "Uploaded object part");
        Ok(elapsed)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn resume_offset(&self, session: &UploadSession) -> StorageResult<ResumeOffset> {
        let builder = self
            .client
            .put(session.as_str())
            .header(CONTENT_RANGE, "bytes */*")
            .body(Bytes::new());

        let (completed, _) = self.send_timed(builder, "query resume offset").await?;
        if completed.status == StatusCode::PERMANENT_REDIRECT {
            let offset = match &completed.range {
                Some(range) => parse_range(range).ok_or_else(|| {
                    StorageError::UnexpectedResponse(format!("malformed Range header `{range}`"))
                })?,
                None => 0,
            };
            return Ok(ResumeOffset {
                offset,
                is_final: false,
            });
        }

        let completed = completed.expect_success("query resume offset")?;
        let object: ObjectResource = serde_json::from_slice(&completed.body).map_err(|cause| {
            StorageError::Generic {
                context: "failed to parse object resource".into(),
                cause: Box::new(cause),
            }
        })?;
        let offset = object.size.parse().map_err(|_| {
            StorageError::UnexpectedResponse(format!("invalid object size `{}`", object.size))
        })?;

        Ok(ResumeOffset {
            offset,
            is_final: true,
        })
    }
}

/// A fully read response.
struct Completed {
    status: StatusCode,
    location: Option<String>,
    range: Option<String>,
    body: Bytes,
}

impl Completed {
    async fn read(response: Response, context: &str) -> StorageResult<Self> {
        let status = response.status();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        let location = header(LOCATION);
        let range = header(RANGE);
        let body = response.bytes().await.map_err(reqwest_error(context))?;

        Ok(Self {
            status,
            location,
            range,
            body,
        })
    }

    fn expect_success(self, context: &str) -> StorageResult<Self> {
        if self.status.is_success() {
            return Ok(self);
        }

        Err(StorageError::Status {
            context: context.to_owned(),
            status: self.status,
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }
}

#[derive(Debug, Serialize)]
struct NewObject<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ObjectResource {
    /// The object size in bytes, encoded as a decimal string.
    size: String,
}

fn reqwest_error(context: &str) -> impl FnOnce(reqwest::Error) -> StorageError + '_ {
    move |cause| StorageError::Reqwest {
        context: context.to_owned(),
        cause,
    }
}

/// Builds the `Content-Range` header for a chunk of `len` bytes at `offset`.
///
/// Only the final chunk declares the total object size.
fn content_range(offset: u64, len: u64, is_final: bool) -> String {
    let total = offset + len;
    match (len, is_final) {
        (0, true) => format!("bytes */{total}"),
        (0, false) => "bytes */*".to_owned(),
        (_, true) => format!("bytes {offset}-{}/{total}", total - 1),
        (_, false) => format!("bytes {offset}-{}/*", total - 1),
    }
}

/// Parses a `Range: bytes=0-{end}` header into the number of persisted bytes.
fn parse_range(value: &str) -> Option<u64> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    if start != "0" {
        return None;
    }
    end.parse::<u64>().ok()?.checked_add(1)
}
