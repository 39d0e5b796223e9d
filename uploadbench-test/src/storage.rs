//! A scripted, in-process [`Storage`] for driver tests.
//!
//! [`StubStorage`] keeps track of every call it receives and behaves like a well-behaved server
//! by default: objects are accepted, sessions track the bytes they received and finalize on the
//! final chunk. Faults can be scheduled on the n-th call of an operation to exercise the error
//! paths of the drivers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use uploadbench_storage::{ResumeOffset, Storage, StorageError, StorageResult, UploadSession};

/// Number of calls a [`StubStorage`] received, per operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Calls to [`Storage::upload_object`].
    pub upload_object: usize,
    /// Calls to [`Storage::new_upload_session`].
    pub new_upload_session: usize,
    /// Calls to [`Storage::upload_object_part`].
    pub upload_object_part: usize,
    /// Calls to [`Storage::resume_offset`].
    pub resume_offset: usize,
}

impl CallCounts {
    /// Total number of calls across all operations.
    pub fn total(&self) -> usize {
        self.upload_object + self.new_upload_session + self.upload_object_part + self.resume_offset
    }
}

/// A chunk upload as received by the [`StubStorage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartCall {
    /// The session the chunk was uploaded to.
    pub session: UploadSession,
    /// The offset the client declared for the chunk.
    pub offset: u64,
    /// Size of the chunk in bytes.
    pub len: u64,
    /// Whether the client marked the chunk as final.
    pub is_final: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    received: u64,
    finalized: bool,
}

#[derive(Debug, Default)]
struct State {
    calls: CallCounts,
    objects: Vec<(String, String, u64)>,
    sessions: HashMap<UploadSession, SessionState>,
    parts: Vec<PartCall>,
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Fail,
    Offset(u64),
    Final(bool),
}

/// An in-process [`Storage`] that records calls and injects faults.
///
/// Calls are numbered per operation, starting at zero.
#[derive(Debug)]
pub struct StubStorage {
    durations: Vec<Duration>,
    object_faults: BTreeMap<usize, Fault>,
    session_faults: BTreeMap<usize, Fault>,
    part_faults: BTreeMap<usize, Fault>,
    offset_faults: BTreeMap<usize, Fault>,
    state: Mutex<State>,
}

impl Default for StubStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StubStorage {
    /// Creates a stub that accepts every call and reports 250ms per upload.
    pub fn new() -> Self {
        Self {
            durations: vec![Duration::from_millis(250)],
            object_faults: BTreeMap::new(),
            session_faults: BTreeMap::new(),
            part_faults: BTreeMap::new(),
            offset_faults: BTreeMap::new(),
            state: Mutex::default(),
        }
    }

    /// Reports these durations for uploads, cycling through them across all upload calls.
    pub fn durations(mut self, durations: impl IntoIterator<Item = Duration>) -> Self {
        self.durations = durations.into_iter().collect();
        assert!(!self.durations.is_empty(), "at least one duration required");
        self
    }

    /// Fails the `nth` call to [`Storage::upload_object`].
    pub fn fail_upload_object(mut self, nth: usize) -> Self {
        self.object_faults.insert(nth, Fault::Fail);
        self
    }

    /// Fails the `nth` call to [`Storage::new_upload_session`].
    pub fn fail_new_upload_session(mut self, nth: usize) -> Self {
        self.session_faults.insert(nth, Fault::Fail);
        self
    }

    /// Fails the `nth` call to [`Storage::upload_object_part`].
    pub fn fail_upload_object_part(mut self, nth: usize) -> Self {
        self.part_faults.insert(nth, Fault::Fail);
        self
    }

    /// Fails the `nth` call to [`Storage::resume_offset`].
    pub fn fail_resume_offset(mut self, nth: usize) -> Self {
        self.offset_faults.insert(nth, Fault::Fail);
        self
    }

    /// Reports `offset` instead of the received byte count on the `nth` offset query.
    pub fn report_offset(mut self, nth: usize, offset: u64) -> Self {
        self.offset_faults.insert(nth, Fault::Offset(offset));
        self
    }

    /// Reports `is_final` instead of the actual session state on the `nth` offset query.
    pub fn report_final(mut self, nth: usize, is_final: bool) -> Self {
        self.offset_faults.insert(nth, Fault::Final(is_final));
        self
    }

    /// Returns how often each operation has been called so far.
    pub fn calls(&self) -> CallCounts {
        self.state.lock().unwrap().calls
    }

    /// Returns the names of all uploaded whole objects, in upload order.
    pub fn object_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.objects.iter().map(|(_, name, _)| name.clone()).collect()
    }

    /// Returns all received chunk uploads, in upload order.
    pub fn parts(&self) -> Vec<PartCall> {
        self.state.lock().unwrap().parts.clone()
    }

    fn next_duration(&self, state: &State) -> Duration {
        let uploads = state.calls.upload_object + state.calls.upload_object_part;
        self.durations[uploads % self.durations.len()]
    }
}

fn injected(operation: &str, nth: usize) -> StorageError {
    StorageError::Generic {
        context: format!("{operation} #{nth}"),
        cause: "injected failure".into(),
    }
}

#[async_trait::async_trait]
impl Storage for StubStorage {
    async fn upload_object(
        &self,
        bucket: &str,
        name: &str,
        payload: Bytes,
    ) -> StorageResult<Duration> {
        let mut state = self.state.lock().unwrap();
        let nth = state.calls.upload_object;
        let duration = self.next_duration(&state);
        state.calls.upload_object += 1;

        if let Some(Fault::Fail) = self.object_faults.get(&nth) {
            return Err(injected("upload_object", nth));
        }

        state
            .objects
            .push((bucket.to_owned(), name.to_owned(), payload.len() as u64));
        Ok(duration)
    }

    async fn new_upload_session(&self, bucket: &str, name: &str) -> StorageResult<UploadSession> {
        let mut state = self.state.lock().unwrap();
        let nth = state.calls.new_upload_session;
        state.calls.new_upload_session += 1;

        if let Some(Fault::Fail) = self.session_faults.get(&nth) {
            return Err(injected("new_upload_session", nth));
        }

        let session = UploadSession::new(format!("stub://{bucket}/{name}?session={nth}"));
        state.sessions.insert(session.clone(), SessionState::default());
        Ok(session)
    }

    async fn upload_object_part(
        &self,
        session: &UploadSession,
        offset: u64,
        payload: Bytes,
        is_final: bool,
    ) -> StorageResult<Duration> {
        let mut state = self.state.lock().unwrap();
        let nth = state.calls.upload_object_part;
        let duration = self.next_duration(&state);
        state.calls.upload_object_part += 1;

        let len = payload.len() as u64;
        state.parts.push(PartCall {
            session: session.clone(),
            offset,
            len,
            is_final,
        });

        if let Some(Fault::Fail) = self.part_faults.get(&nth) {
            return Err(injected("upload_object_part", nth));
        }

        let Some(session_state) = state.sessions.get_mut(session) else {
            return Err(injected("upload_object_part on unknown session", nth));
        };
        if session_state.finalized || session_state.received != offset {
            return Err(StorageError::UnexpectedResponse(format!(
                "chunk at offset {offset} does not continue session at {}",
                session_state.received
            )));
        }

        session_state.received += len;
        session_state.finalized = is_final;
        Ok(duration)
    }

    async fn resume_offset(&self, session: &UploadSession) -> StorageResult<ResumeOffset> {
        let mut state = self.state.lock().unwrap();
        let nth = state.calls.resume_offset;
        state.calls.resume_offset += 1;

        let Some(session_state) = state.sessions.get(session) else {
            return Err(injected("resume_offset on unknown session", nth));
        };
        let mut reported = ResumeOffset {
            offset: session_state.received,
            is_final: session_state.finalized,
        };

        match self.offset_faults.get(&nth) {
            Some(Fault::Fail) => return Err(injected("resume_offset", nth)),
            Some(Fault::Offset(offset)) => reported.offset = *offset,
            Some(Fault::Final(is_final)) => reported.is_final = *is_final,
            None => {}
        }

        Ok(reported)
    }
}
