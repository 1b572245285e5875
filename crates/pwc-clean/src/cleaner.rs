//! The long-lived cleaner handle and its state machine.
//!
//! A [`Cleaner`] moves `Idle → Bound` when I/O is bound, `Bound → Running`
//! for the duration of [`Cleaner::run`], and back to `Bound` afterwards
//! whatever the outcome. [`SharedCleaner`] exposes the same handle to several
//! threads; there the `Running` state is observable and rejects a second run
//! or any mutation of the secret set until the first run is over.

use crate::buffer::ScanBuffer;
use crate::driver::{RunStats, StreamDriver};
use crate::io::{ChunkSink, ChunkSource};
use crate::table::SecretTable;
use crate::{CleanError, Result};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Chunk size used when 0 is requested.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Operation state of a cleaner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanerState {
    /// No I/O bound.
    Idle,
    /// Read and write operations bound; ready to run.
    Bound,
    /// A run is in progress.
    Running,
}

impl std::fmt::Display for CleanerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanerState::Idle => write!(f, "idle"),
            CleanerState::Bound => write!(f, "bound"),
            CleanerState::Running => write!(f, "running"),
        }
    }
}

/// Read and write operations bound to a cleaner.
pub struct StreamSession {
    source: Box<dyn ChunkSource + Send>,
    sink: Box<dyn ChunkSink + Send>,
}

impl StreamSession {
    pub fn new<R, W>(source: R, sink: W) -> Self
    where
        R: ChunkSource + Send + 'static,
        W: ChunkSink + Send + 'static,
    {
        Self {
            source: Box::new(source),
            sink: Box::new(sink),
        }
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession").finish_non_exhaustive()
    }
}

/// Everything a run needs, detached from the cleaner while it streams.
struct RunJob {
    table: Arc<SecretTable>,
    buffer: ScanBuffer,
    session: StreamSession,
    chunk_size: usize,
}

impl RunJob {
    fn drive(&mut self) -> Result<RunStats> {
        let session = &mut self.session;
        StreamDriver::new(&self.table, self.chunk_size).run(
            &mut self.buffer,
            session.source.as_mut(),
            session.sink.as_mut(),
        )
    }
}

/// Scrubs a configured set of secrets from streams.
///
/// ```
/// use pwc_clean::{Cleaner, SharedBuffer};
///
/// let mut cleaner = Cleaner::new(0);
/// cleaner.add("mysecret", "^^^PASSWORD^^^").unwrap();
///
/// let output = SharedBuffer::new();
/// cleaner.bind_io(&b"login mysecret now"[..], output.clone()).unwrap();
/// cleaner.run().unwrap();
/// assert_eq!(output.contents(), b"login ^^^PASSWORD^^^ now");
/// ```
#[derive(Debug)]
pub struct Cleaner {
    table: Arc<SecretTable>,
    chunk_size: usize,
    buffer: Option<ScanBuffer>,
    session: Option<StreamSession>,
    state: CleanerState,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Cleaner {
    /// Create a cleaner processing `chunk_size` bytes per read.
    ///
    /// 0 selects [`DEFAULT_CHUNK_SIZE`]. The scan buffer is allocated lazily
    /// at twice the effective chunk size.
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            table: Arc::new(SecretTable::new()),
            chunk_size,
            buffer: Some(ScanBuffer::new()),
            session: None,
            state: CleanerState::Idle,
        }
    }

    /// Register `pattern` to be replaced by `substitute`.
    ///
    /// Re-adding a pattern replaces its substitute.
    pub fn add(&mut self, pattern: impl AsRef<[u8]>, substitute: impl AsRef<[u8]>) -> Result<()> {
        self.ensure_not_running("add")?;
        Arc::make_mut(&mut self.table).add(pattern.as_ref(), substitute.as_ref())?;
        Ok(())
    }

    /// Stop replacing `pattern`.
    pub fn remove(&mut self, pattern: impl AsRef<[u8]>) -> Result<()> {
        self.ensure_not_running("remove")?;
        Arc::make_mut(&mut self.table).remove(pattern.as_ref())?;
        Ok(())
    }

    /// Visit every `(pattern, substitute)` pair. For diagnostics only.
    pub fn dump<F>(&self, visit: F)
    where
        F: FnMut(&[u8], &[u8]),
    {
        self.table.enumerate(visit);
    }

    /// Bind the read and write operations used by [`run`](Self::run).
    ///
    /// Replaces any previous binding.
    pub fn bind_io<R, W>(&mut self, source: R, sink: W) -> Result<()>
    where
        R: ChunkSource + Send + 'static,
        W: ChunkSink + Send + 'static,
    {
        self.bind_session(StreamSession::new(source, sink))
    }

    /// Bind an already assembled session.
    pub fn bind_session(&mut self, session: StreamSession) -> Result<()> {
        self.ensure_not_running("bind_io")?;
        self.session = Some(session);
        self.state = CleanerState::Bound;
        Ok(())
    }

    /// Drop the bound session, returning it.
    pub fn unbind_io(&mut self) -> Result<Option<StreamSession>> {
        self.ensure_not_running("unbind_io")?;
        self.state = CleanerState::Idle;
        Ok(self.session.take())
    }

    /// Clean the bound source into the bound sink.
    ///
    /// The binding stays in place afterwards, so the next call continues with
    /// whatever the source yields next.
    pub fn run(&mut self) -> Result<RunStats> {
        let mut job = self.begin_run()?;
        let result = job.drive();
        self.finish_run(job, &result);
        result
    }

    /// Clean a complete in-memory input into `sink`.
    ///
    /// Independent of the bound session and of the state machine.
    pub fn clean_to_writer(
        &self,
        input: impl AsRef<[u8]>,
        sink: &mut dyn ChunkSink,
    ) -> Result<RunStats> {
        StreamDriver::new(&self.table, self.chunk_size).run_slice(input.as_ref(), sink)
    }

    /// Clean `input` and return the result.
    pub fn clean_to_vec(&self, input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let input = input.as_ref();
        let mut out = Vec::with_capacity(input.len() + input.len() / 10);
        self.clean_to_writer(input, &mut out)?;
        Ok(out)
    }

    /// Clean a string. Fails only if a substitute broke UTF-8.
    pub fn clean_str(&self, input: &str) -> Result<String> {
        String::from_utf8(self.clean_to_vec(input)?).map_err(|_| {
            CleanError::InvalidParameter("cleaned output is not valid UTF-8".to_string())
        })
    }

    pub fn state(&self) -> CleanerState {
        self.state
    }

    /// Configured chunk size, before adjustment to the longest pattern.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunk size actually read per call.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(self.table.max_pattern_len())
    }

    pub fn max_pattern_len(&self) -> usize {
        self.table.max_pattern_len()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Read-only view of the secret table.
    pub fn table(&self) -> &SecretTable {
        &self.table
    }

    /// Capacity of the scan buffer, 0 until the first run.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.as_ref().map_or(0, ScanBuffer::capacity)
    }

    fn ensure_not_running(&self, operation: &'static str) -> Result<()> {
        if self.state == CleanerState::Running {
            return Err(CleanError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn begin_run(&mut self) -> Result<RunJob> {
        if self.state != CleanerState::Bound {
            return Err(CleanError::InvalidState {
                operation: "run",
                state: self.state,
            });
        }
        let Some(session) = self.session.take() else {
            return Err(CleanError::InvalidState {
                operation: "run",
                state: CleanerState::Idle,
            });
        };
        let mut buffer = self.buffer.take().unwrap_or_default();

        let chunk_size = self.effective_chunk_size();
        if let Err(err) = buffer.grow_to(chunk_size.saturating_mul(2)) {
            self.session = Some(session);
            self.buffer = Some(buffer);
            return Err(err);
        }

        self.state = CleanerState::Running;
        tracing::debug!(
            target: "pwc_clean::cleaner",
            secrets = self.table.len(),
            chunk_size,
            capacity = buffer.capacity(),
            "run started"
        );
        Ok(RunJob {
            table: Arc::clone(&self.table),
            buffer,
            session,
            chunk_size,
        })
    }

    fn restore(&mut self, job: RunJob) {
        self.buffer = Some(job.buffer);
        self.session = Some(job.session);
        self.state = CleanerState::Bound;
    }

    fn finish_run(&mut self, job: RunJob, result: &Result<RunStats>) {
        self.restore(job);
        match result {
            Ok(stats) => tracing::debug!(
                target: "pwc_clean::cleaner",
                bytes_read = stats.bytes_read,
                bytes_written = stats.bytes_written,
                replacements = stats.replacements,
                "run finished"
            ),
            Err(err) => tracing::debug!(
                target: "pwc_clean::cleaner",
                code = err.code(),
                error = %err,
                "run aborted"
            ),
        }
    }
}

/// Cloneable, thread-safe handle to one [`Cleaner`].
///
/// The lock is only held for bookkeeping: a run releases it while it
/// streams, so other threads see the `Running` state instead of blocking.
/// In-memory cleaning reads a separately published copy of the table and
/// never takes the cleaner lock, so it is safe to call from a log writer
/// even while this handle is mutating or running.
#[derive(Debug, Clone)]
pub struct SharedCleaner {
    inner: Arc<Mutex<Cleaner>>,
    published: Arc<RwLock<Arc<SecretTable>>>,
    chunk_size: usize,
}

impl From<Cleaner> for SharedCleaner {
    fn from(cleaner: Cleaner) -> Self {
        Self::new(cleaner)
    }
}

impl SharedCleaner {
    pub fn new(cleaner: Cleaner) -> Self {
        Self {
            published: Arc::new(RwLock::new(Arc::clone(&cleaner.table))),
            chunk_size: cleaner.chunk_size,
            inner: Arc::new(Mutex::new(cleaner)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cleaner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, cleaner: &Cleaner) {
        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *published = Arc::clone(&cleaner.table);
    }

    fn snapshot(&self) -> Arc<SecretTable> {
        let published = self
            .published
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*published)
    }

    pub fn add(&self, pattern: impl AsRef<[u8]>, substitute: impl AsRef<[u8]>) -> Result<()> {
        let mut cleaner = self.lock();
        cleaner.add(pattern, substitute)?;
        self.publish(&cleaner);
        Ok(())
    }

    pub fn remove(&self, pattern: impl AsRef<[u8]>) -> Result<()> {
        let mut cleaner = self.lock();
        cleaner.remove(pattern)?;
        self.publish(&cleaner);
        Ok(())
    }

    pub fn dump<F>(&self, visit: F)
    where
        F: FnMut(&[u8], &[u8]),
    {
        self.snapshot().enumerate(visit);
    }

    pub fn bind_io<R, W>(&self, source: R, sink: W) -> Result<()>
    where
        R: ChunkSource + Send + 'static,
        W: ChunkSink + Send + 'static,
    {
        self.lock().bind_io(source, sink)
    }

    pub fn unbind_io(&self) -> Result<Option<StreamSession>> {
        self.lock().unbind_io()
    }

    /// Run the bound session without holding the lock while streaming.
    ///
    /// A panic in the source or sink returns the handle to `Bound` before it
    /// propagates.
    pub fn run(&self) -> Result<RunStats> {
        let mut job = self.lock().begin_run()?;
        match panic::catch_unwind(AssertUnwindSafe(|| job.drive())) {
            Ok(result) => {
                self.lock().finish_run(job, &result);
                result
            }
            Err(payload) => {
                self.lock().restore(job);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Clean an in-memory input against the current secret set.
    ///
    /// Allowed while a run is in progress; it works on the published table
    /// and never touches the shared scan buffer.
    pub fn clean_to_writer(
        &self,
        input: impl AsRef<[u8]>,
        sink: &mut dyn ChunkSink,
    ) -> Result<RunStats> {
        let table = self.snapshot();
        StreamDriver::new(&table, self.chunk_size).run_slice(input.as_ref(), sink)
    }

    pub fn clean_to_vec(&self, input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let input = input.as_ref();
        let mut out = Vec::with_capacity(input.len());
        self.clean_to_writer(input, &mut out)?;
        Ok(out)
    }

    pub fn state(&self) -> CleanerState {
        self.lock().state()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{sink_fn, source_fn, SharedBuffer};
    use std::sync::mpsc;

    #[test]
    fn test_default_chunk_size() {
        let cleaner = Cleaner::new(0);
        assert_eq!(cleaner.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(cleaner.state(), CleanerState::Idle);
        assert_eq!(cleaner.buffer_capacity(), 0);
    }

    #[test]
    fn test_chunk_floor_adjusted_to_longest_secret() {
        let mut cleaner = Cleaner::new(4);
        cleaner.add("password", "X").unwrap();
        assert_eq!(cleaner.chunk_size(), 4);
        assert_eq!(cleaner.effective_chunk_size(), 8);
    }

    #[test]
    fn test_run_requires_binding() {
        let mut cleaner = Cleaner::new(16);
        let err = cleaner.run().unwrap_err();
        assert!(matches!(
            err,
            CleanError::InvalidState {
                operation: "run",
                state: CleanerState::Idle
            }
        ));
    }

    #[test]
    fn test_bind_run_rebind() {
        let mut cleaner = Cleaner::new(4);
        cleaner.add("password", "X").unwrap();

        let first = SharedBuffer::new();
        cleaner
            .bind_io(&b"the password is set"[..], first.clone())
            .unwrap();
        assert_eq!(cleaner.state(), CleanerState::Bound);
        cleaner.run().unwrap();
        assert_eq!(first.contents(), b"the X is set");
        assert_eq!(cleaner.state(), CleanerState::Bound);
        assert_eq!(cleaner.buffer_capacity(), 16);

        let second = SharedBuffer::new();
        cleaner.bind_io(&b"password"[..], second.clone()).unwrap();
        cleaner.run().unwrap();
        assert_eq!(second.contents(), b"X");
    }

    #[test]
    fn test_buffer_grows_when_longer_secret_added() {
        let mut cleaner = Cleaner::new(4);
        cleaner.add("abc", "1").unwrap();
        cleaner.bind_io(&b"abc"[..], SharedBuffer::new()).unwrap();
        cleaner.run().unwrap();
        assert_eq!(cleaner.buffer_capacity(), 8);

        cleaner.add("a-much-longer-secret", "2").unwrap();
        let out = SharedBuffer::new();
        cleaner
            .bind_io(&b"x a-much-longer-secret y"[..], out.clone())
            .unwrap();
        cleaner.run().unwrap();
        assert_eq!(out.contents(), b"x 2 y");
        assert_eq!(cleaner.buffer_capacity(), 40);

        cleaner.remove("a-much-longer-secret").unwrap();
        assert_eq!(cleaner.max_pattern_len(), 3);
        assert_eq!(cleaner.buffer_capacity(), 40);
    }

    #[test]
    fn test_failed_run_returns_to_bound() {
        let mut cleaner = Cleaner::new(8);
        cleaner.add("secret", "x").unwrap();
        cleaner
            .bind_io(
                source_fn(|_buf: &mut [u8]| Err(std::io::Error::other("nope"))),
                SharedBuffer::new(),
            )
            .unwrap();
        assert!(cleaner.run().unwrap_err().is_io());
        assert_eq!(cleaner.state(), CleanerState::Bound);
    }

    #[test]
    fn test_unbind_returns_to_idle() {
        let mut cleaner = Cleaner::new(8);
        cleaner.bind_io(&b""[..], SharedBuffer::new()).unwrap();
        assert!(cleaner.unbind_io().unwrap().is_some());
        assert_eq!(cleaner.state(), CleanerState::Idle);
        assert!(cleaner.run().is_err());
    }

    #[test]
    fn test_clean_str() {
        let mut cleaner = Cleaner::new(0);
        cleaner.add("ab", "1").unwrap();
        cleaner.add("abc", "2").unwrap();
        assert_eq!(cleaner.clean_str("xabcy").unwrap(), "x2y");
        assert_eq!(cleaner.state(), CleanerState::Idle);
    }

    #[test]
    fn test_clean_str_rejects_broken_utf8() {
        let mut cleaner = Cleaner::new(0);
        cleaner.add("pw", [0xffu8]).unwrap();
        assert!(matches!(
            cleaner.clean_str("my pw"),
            Err(CleanError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_shared_rejects_work_while_running() {
        let shared = SharedCleaner::new(Cleaner::new(8));
        shared.add("secret", "x").unwrap();

        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let mut first = true;
        let source = source_fn(move |buf: &mut [u8]| {
            if first {
                first = false;
                entered_tx.send(()).ok();
                release_rx.recv().ok();
                buf[..3].copy_from_slice(b"abc");
                return Ok(3);
            }
            Ok(0)
        });
        let out = SharedBuffer::new();
        shared.bind_io(source, out.clone()).unwrap();

        let runner = {
            let shared = shared.clone();
            std::thread::spawn(move || shared.run())
        };
        entered_rx.recv().unwrap();

        assert_eq!(shared.state(), CleanerState::Running);
        assert!(matches!(
            shared.run(),
            Err(CleanError::InvalidState { operation: "run", .. })
        ));
        assert!(matches!(
            shared.add("other", "y"),
            Err(CleanError::InvalidState { operation: "add", .. })
        ));
        assert!(matches!(
            shared.remove("secret"),
            Err(CleanError::InvalidState { .. })
        ));
        assert!(matches!(
            shared.bind_io(&b""[..], SharedBuffer::new()),
            Err(CleanError::InvalidState { .. })
        ));
        // in-memory cleaning works from a table snapshot
        assert_eq!(shared.clean_to_vec("a secret").unwrap(), b"a x");

        release_tx.send(()).unwrap();
        runner.join().unwrap().unwrap();
        assert_eq!(shared.state(), CleanerState::Bound);
        assert_eq!(out.contents(), b"abc");
        shared.add("other", "y").unwrap();
    }

    #[test]
    fn test_shared_clean_does_not_take_cleaner_lock() {
        let shared = SharedCleaner::new(Cleaner::new(0));
        shared.add("secret", "x").unwrap();

        let _held = shared.lock();
        assert_eq!(shared.clean_to_vec("a secret").unwrap(), b"a x");
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn test_shared_recovers_from_panicking_sink() {
        let shared = SharedCleaner::new(Cleaner::new(8));
        shared.add("secret", "x").unwrap();
        shared
            .bind_io(
                &b"a secret"[..],
                sink_fn(|_buf: &[u8]| -> std::io::Result<usize> { panic!("sink exploded") }),
            )
            .unwrap();

        let runner = {
            let shared = shared.clone();
            std::thread::spawn(move || shared.run())
        };
        assert!(runner.join().is_err());

        assert_eq!(shared.state(), CleanerState::Bound);
        shared.add("other", "y").unwrap();
        let out = SharedBuffer::new();
        shared.bind_io(&b"other secret"[..], out.clone()).unwrap();
        shared.run().unwrap();
        assert_eq!(out.contents(), b"y x");
    }

    #[test]
    fn test_state_and_stats_serialize() {
        assert_eq!(
            serde_json::to_string(&CleanerState::Running).unwrap(),
            r#""running""#
        );

        let mut cleaner = Cleaner::new(8);
        cleaner.add("secret", "x").unwrap();
        cleaner
            .bind_io(&b"a secret"[..], SharedBuffer::new())
            .unwrap();
        let stats = cleaner.run().unwrap();

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["bytes_read"], 8);
        assert_eq!(json["bytes_written"], 3);
        assert_eq!(json["replacements"], 1);
        let back: RunStats = serde_json::from_value(json).unwrap();
        assert_eq!(back, stats);
    }

    #[test]
    fn test_short_write_surfaces_io_failure() {
        let mut cleaner = Cleaner::new(8);
        cleaner.add("secret", "x").unwrap();
        cleaner
            .bind_io(&b"a secret here"[..], sink_fn(|_buf: &[u8]| Ok(0)))
            .unwrap();
        assert!(matches!(
            cleaner.run(),
            Err(CleanError::IoFailure {
                direction: crate::IoDirection::Write,
                ..
            })
        ));
    }
}
