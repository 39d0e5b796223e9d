//! Resumable uploads in fixed-size chunks.
//!
//! For every size, one upload session is opened and the same payload is uploaded into it
//! `runs` times. After every chunk the resume offset is queried from the server and compared with
//! the offset tracked locally. Any difference means the server lost or reordered data and
//! aborts the benchmark, since the measurement would no longer describe a correct upload.

use std::time::Duration;

use bytes::Bytes;
use indicatif::ProgressBar;
use uploadbench_storage::{ResumeOffset, Storage, UploadSession};

use crate::config::{BenchConfig, TrialSize};
use crate::error::{BenchError, BenchResult};

/// Client-side state of an open upload session.
///
/// The session moves through `SessionOpened → {ChunkUploaded → OffsetVerified}* → Done`. A chunk
/// only counts as uploaded once the server confirmed its offset. There is no way back, and every
/// error is terminal for the session.
#[derive(Debug)]
pub struct ResumableUpload {
    session: UploadSession,
    offset: u64,
    uploaded_chunks: usize,
    total_chunks: usize,
}

impl ResumableUpload {
    /// Opens a session for the object `name` in `bucket` that will receive `total_chunks` chunks.
    pub async fn open<S>(
        storage: &S,
        bucket: &str,
        name: &str,
        total_chunks: usize,
    ) -> BenchResult<Self>
    where
        S: Storage + ?Sized,
    {
        let session = storage.new_upload_session(bucket, name).await?;
        tracing::debug!(%session, total_chunks, "Opened upload session");

        Ok(Self {
            session,
            offset: 0,
            uploaded_chunks: 0,
            total_chunks,
        })
    }

    /// The number of bytes uploaded and confirmed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the final chunk has been uploaded and confirmed.
    pub fn is_done(&self) -> bool {
        self.uploaded_chunks >= self.total_chunks
    }

    /// Uploads the next chunk, verifies the session state and returns the upload duration.
    ///
    /// The last of `total_chunks` chunks finalizes the upload.
    pub async fn upload_chunk<S>(&mut self, storage: &S, chunk: Bytes) -> BenchResult<Duration>
    where
        S: Storage + ?Sized,
    {
        debug_assert!(!self.is_done(), "upload session is already finalized");

        let is_final = self.uploaded_chunks + 1 == self.total_chunks;
        let len = chunk.len() as u64;

        let elapsed = storage
            .upload_object_part(&self.session, self.offset, chunk, is_final)
            .await?;
        self.offset += len;
        self.uploaded_chunks += 1;

        let ResumeOffset {
            offset: server_offset,
            is_final: server_final,
        } = storage.resume_offset(&self.session).await?;

        if server_offset != self.offset {
            return Err(BenchError::OffsetMismatch {
                got: server_offset,
                want: self.offset,
            });
        }
        if server_final != is_final {
            return Err(BenchError::FinalFlagMismatch {
                got: server_final,
                want: is_final,
            });
        }

        tracing::debug!(offset = self.offset, is_final, ?elapsed, "Uploaded chunk");
        Ok(elapsed)
    }
}

/// Uploads `payload` as `config.runs` chunks of a single object and returns the duration of each
/// chunk upload.
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
    let name = size.session_object_name(&config.prefix);
    let mut upload = ResumableUpload::open(storage, &config.bucket, &name, config.runs).await?;

    let mut durations = Vec::with_capacity(config.runs);
    while !upload.is_done() {
        durations.push(upload.upload_chunk(storage, payload.clone()).await?);
        progress.inc(1);
    }

    Ok(durations)
}

#[cfg(test)]
mod tests {
    use uploadbench_storage::StorageError;
    use uploadbench_test::storage::{CallCounts, StubStorage};

    use super::*;

    const CHUNK: u64 = 1024;

    fn config(runs: usize) -> BenchConfig {
        BenchConfig {
            runs,
            min_size: CHUNK,
            max_size: CHUNK,
            ..BenchConfig::new("bucket")
        }
    }

    fn first_size(config: &BenchConfig) -> TrialSize {
        config.sizes().next().unwrap()
    }

    #[tokio::test]
    async fn tracks_offset_and_final_flag() {
        uploadbench_test::tracing::init();
        let storage = StubStorage::new();
        let chunk = Bytes::from(vec![0; CHUNK as usize]);

        let mut upload = ResumableUpload::open(&storage, "bucket", "x-1", 4)
            .await
            .unwrap();
        assert_eq!(upload.offset(), 0);

        for i in 0..4 {
            assert!(!upload.is_done());
            upload.upload_chunk(&storage, chunk.clone()).await.unwrap();
            assert_eq!(upload.offset(), (i + 1) * CHUNK);
        }
        assert!(upload.is_done());

        let parts = storage.parts();
        let offsets: Vec<_> = parts.iter().map(|part| part.offset).collect();
        let finals: Vec<_> = parts.iter().map(|part| part.is_final).collect();
        assert_eq!(offsets, [0, CHUNK, 2 * CHUNK, 3 * CHUNK]);
        assert_eq!(finals, [false, false, false, true]);
        assert!(parts.iter().all(|part| part.len == CHUNK));
    }

    #[tokio::test]
    async fn verifies_every_chunk() {
        let storage = StubStorage::new();
        let config = config(16);

        let durations = run_size(
            &storage,
            &config,
            first_size(&config),
            Bytes::from(vec![0; CHUNK as usize]),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        assert_eq!(durations.len(), 16);
        assert_eq!(
            storage.calls(),
            CallCounts {
                upload_object: 0,
                new_upload_session: 1,
                upload_object_part: 16,
                resume_offset: 16,
            }
        );
    }

    #[tokio::test]
    async fn single_chunk_is_final() {
        let storage = StubStorage::new();
        let config = config(1);

        run_size(
            &storage,
            &config,
            first_size(&config),
            Bytes::from(vec![0; CHUNK as usize]),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        let parts = storage.parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].offset, 0);
        assert!(parts[0].is_final);
    }

    #[tokio::test]
    async fn offset_mismatch_stops_upload() {
        let storage = StubStorage::new().report_offset(2, 42);
        let config = config(16);

        let err = run_size(
            &storage,
            &config,
            first_size(&config),
            Bytes::from(vec![0; CHUNK as usize]),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap_err();

        assert!(
            matches!(err, BenchError::OffsetMismatch { got: 42, want } if want == 3 * CHUNK),
            "{err:?}"
        );
        assert_eq!(err.to_string(), "unexpected offset: got 42, want 3072");

        let calls = storage.calls();
        assert_eq!(calls.upload_object_part, 3);
        assert_eq!(calls.resume_offset, 3);
    }

    #[tokio::test]
    async fn final_flag_mismatch_stops_upload() {
        let storage = StubStorage::new().report_final(0, true);
        let config = config(16);

        let err = run_size(
            &storage,
            &config,
            first_size(&config),
            Bytes::from(vec![0; CHUNK as usize]),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap_err();

        assert!(
            matches!(
                err,
                BenchError::FinalFlagMismatch {
                    got: true,
                    want: false
                }
            ),
            "{err:?}"
        );
        assert_eq!(
            err.to_string(),
            "unexpected final chunk flag: got true, want false"
        );
        assert_eq!(storage.calls().upload_object_part, 1);
    }

    #[tokio::test]
    async fn unfinalized_last_chunk_is_detected() {
        let storage = StubStorage::new().report_final(3, false);
        let config = config(4);

        let err = run_size(
            &storage,
            &config,
            first_size(&config),
            Bytes::from(vec![0; CHUNK as usize]),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap_err();

        assert!(
            matches!(
                err,
                BenchError::FinalFlagMismatch {
                    got: false,
                    want: true
                }
            ),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn chunk_failure_stops_upload() {
        let storage = StubStorage::new().fail_upload_object_part(5);
        let config = config(16);

        let err = run_size(
            &storage,
            &config,
            first_size(&config),
            Bytes::from(vec![0; CHUNK as usize]),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap_err();

        assert!(
            matches!(err, BenchError::Storage(StorageError::Generic { .. })),
            "{err:?}"
        );

        let calls = storage.calls();
        assert_eq!(calls.upload_object_part, 6);
        assert_eq!(calls.resume_offset, 5);
    }

    #[tokio::test]
    async fn session_failure_uploads_nothing() {
        let storage = StubStorage::new().fail_new_upload_session(0);
        let config = config(16);

        let err = run_size(
            &storage,
            &config,
            first_size(&config),
            Bytes::from(vec![0; CHUNK as usize]),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BenchError::Storage(_)), "{err:?}");
        assert_eq!(
            storage.calls(),
            CallCounts {
                new_upload_session: 1,
                ..Default::default()
            }
        );
    }
}
