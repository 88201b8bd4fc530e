//! # File Handle Manager
//!
//! Every chunk file is owned by exactly one [`FileHandle`]. The handle hides
//! three concerns from the layers above it:
//!
//! 1. **Lazy open / idle close**: the OS handle is opened on first use and
//!    closed after `idle_timeout` without activity, which bounds the number of
//!    open descriptors for topics with many chunks. The next operation
//!    reopens it transparently.
//! 2. **Serialized appends**: all appends go through one FIFO queue drained by
//!    a single worker task. The worker tracks the file size in memory and
//!    writes each append positionally (`pwrite`) at that size, so the offset
//!    it reports is the offset the bytes landed at and two appends can never
//!    be assigned the same offset.
//! 3. **Concurrent reads**: reads bypass the queue and use positional I/O
//!    (`pread`), so they can run alongside queued appends and each other.
//!
//! ## Architecture
//!
//! ```text
//!   append() ──┐                       read() ────────────┐
//!   append() ──┼─► mpsc queue ─► worker task              │
//!   close()  ──┘                  │  (size counter,       │
//!                                 │   idle timer)         │
//!                                 ▼                       ▼
//!                        ┌──────────────────────────────────────┐
//!                        │  Mutex<Option<Arc<File>>>  (shared)  │
//!                        └──────────────────────────────────────┘
//! ```
//!
//! ## Rust Concepts
//!
//! - **`spawn_blocking`**: std file I/O blocks; running it on tokio's blocking
//!   pool keeps the async workers free.
//! - **`Arc<File>` strong count**: a read in flight holds a clone, so the idle
//!   reaper can tell the handle is still in use and must not be closed.
//! - **`tokio::sync::Notify`**: wakes the worker when a read reopens the file
//!   so the idle timer starts running again.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::codec::RecordCodec;
use crate::error::{Error, Result};

// =============================================================================
// Request Types
// =============================================================================

/// Requests processed by the file's worker task, strictly in order.
enum FileRequest {
    /// Append bytes at the current end of the file.
    Append {
        bytes: Bytes,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Release the OS handle once everything queued before it is done.
    Close { response: oneshot::Sender<Result<()>> },
}

// =============================================================================
// Shared State
// =============================================================================

/// State shared between the handle, its worker, and in-flight reads.
struct Shared {
    path: PathBuf,

    /// The open OS handle, if any. The async mutex serializes open/close so
    /// at most one handle exists per file.
    file: Mutex<Option<Arc<File>>>,

    /// Mirrors `file.is_some()` for cheap synchronous checks.
    open: AtomicBool,

    /// Bytes in the file. Only the worker advances it.
    size: AtomicU64,

    /// Reference point for `last_used_ms`.
    created: Instant,

    /// Milliseconds after `created` of the last operation.
    last_used_ms: AtomicU64,

    idle_timeout: Duration,

    /// Signalled whenever the file is (re)opened.
    opened: Notify,
}

impl Shared {
    fn touch(&self) {
        let now = self.created.elapsed().as_millis() as u64;
        self.last_used_ms.store(now, Ordering::Relaxed);
    }

    fn idle_deadline(&self) -> Instant {
        let last_used = Duration::from_millis(self.last_used_ms.load(Ordering::Relaxed));
        self.created + last_used + self.idle_timeout
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Returns the open handle, opening the file first if needed.
    async fn handle(&self) -> Result<Arc<File>> {
        self.touch();

        let mut slot = self.file.lock().await;
        if let Some(file) = slot.as_ref() {
            return Ok(Arc::clone(file));
        }

        let path = self.path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(&path)
        })
        .await?
        .map_err(|e| Error::io("open", &self.path, e))?;

        debug!(path = %self.path.display(), "opened file");

        let file = Arc::new(file);
        *slot = Some(Arc::clone(&file));
        self.open.store(true, Ordering::Release);
        self.opened.notify_one();
        Ok(file)
    }

    /// Appends `bytes` and returns the offset they were written at.
    ///
    /// Only called from the worker, so appends never overlap.
    async fn append(&self, bytes: Bytes) -> Result<u64> {
        let file = self.handle().await?;
        let offset = self.size.load(Ordering::Acquire);
        let expected = bytes.len();

        let (written, failure) =
            tokio::task::spawn_blocking(move || write_fully_at(&file, &bytes, offset)).await?;

        // Whatever reached the file moves the end of the file, even on failure.
        // The next append starts after it.
        self.size.fetch_add(written as u64, Ordering::AcqRel);
        self.touch();

        if let Some(err) = failure {
            return Err(Error::io("write", &self.path, err));
        }
        if written != expected {
            return Err(Error::ShortWrite {
                path: self.path.clone(),
                expected,
                written,
            });
        }
        Ok(offset)
    }

    /// Releases the handle unless a read still holds it.
    ///
    /// A handle in use stays open and is released by the idle timer once the
    /// read is done, so a file never has two OS handles at once.
    async fn close(&self) -> Result<()> {
        let mut slot = self.file.lock().await;
        if slot.as_ref().map_or(false, |file| Arc::strong_count(file) > 1) {
            debug!(path = %self.path.display(), "file in use, deferring close");
            return Ok(());
        }
        if slot.take().is_some() {
            self.open.store(false, Ordering::Release);
            debug!(path = %self.path.display(), "closed file");
        }
        Ok(())
    }

    /// Closes the handle if nothing has touched it for `idle_timeout`.
    async fn close_if_idle(&self) {
        let mut slot = self.file.lock().await;
        if Instant::now() < self.idle_deadline() {
            return;
        }

        let in_use = slot
            .as_ref()
            .map_or(false, |file| Arc::strong_count(file) > 1);
        if in_use {
            // a read is still running; look again after another full timeout
            self.touch();
            return;
        }

        if slot.take().is_some() {
            self.open.store(false, Ordering::Release);
            debug!(path = %self.path.display(), "closed idle file");
        }
    }
}

/// Writes as much of `bytes` at `offset` as the OS accepts.
///
/// Returns the number of bytes written and the error that stopped the write,
/// if any. A write that returns zero bytes stops without an error and shows
/// up as a short write.
fn write_fully_at(file: &File, bytes: &[u8], offset: u64) -> (usize, Option<io::Error>) {
    let mut written = 0;
    while written < bytes.len() {
        match write_at(file, &bytes[written..], offset + written as u64) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (written, Some(e)),
        }
    }
    (written, None)
}

/// Reads up to `length` bytes at `offset`, stopping early only at end of file.
fn read_fully_at(file: &File, offset: u64, length: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; length];
    let mut filled = 0;
    while filled < length {
        match read_at(file, &mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

#[cfg(unix)]
fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.write_at(buf, offset)
}

#[cfg(windows)]
fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_write(buf, offset)
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

// =============================================================================
// Worker Loop
// =============================================================================

/// Drains the request queue and closes the file when it goes idle.
///
/// Exits once every [`FileHandle`] clone has been dropped.
async fn run_file_worker(shared: Arc<Shared>, mut rx: mpsc::Receiver<FileRequest>) {
    loop {
        let deadline = shared.idle_deadline();
        let is_open = shared.is_open();

        tokio::select! {
            request = rx.recv() => match request {
                Some(FileRequest::Append { bytes, response }) => {
                    let result = shared.append(bytes).await;
                    if let Err(ref err) = result {
                        warn!(path = %shared.path.display(), error = %err, "append failed");
                    }
                    let _ = response.send(result);
                }
                Some(FileRequest::Close { response }) => {
                    let _ = response.send(shared.close().await);
                }
                None => break,
            },
            _ = tokio::time::sleep_until(deadline), if is_open => {
                shared.close_if_idle().await;
            }
            _ = shared.opened.notified(), if !is_open => {}
        }
    }

    let _ = shared.close().await;
}

// =============================================================================
// FileHandle
// =============================================================================

/// Owner of one file on disk.
///
/// Cheap to clone: clones share the same queue, worker, and OS handle.
///
/// # Example
///
/// ```rust,ignore
/// let file = FileHandle::open("/data/orders/log-0.log", Duration::from_secs(1), 1024).await?;
/// let at = file.append(Bytes::from_static(b"hello")).await?;
/// let back = file.read(at, 5).await?;
/// assert_eq!(back, b"hello");
/// file.close().await?;
/// ```
#[derive(Clone)]
pub struct FileHandle {
    shared: Arc<Shared>,
    tx: mpsc::Sender<FileRequest>,
}

impl FileHandle {
    /// Creates the manager for `path` and starts its worker task.
    ///
    /// The file is not opened (or created) yet; only its current size is
    /// looked up. A missing file has size zero, and so does anything that is
    /// not a regular file (opening it fails later).
    pub async fn open(
        path: impl Into<PathBuf>,
        idle_timeout: Duration,
        queue_capacity: usize,
    ) -> Result<Self> {
        let path = path.into();

        let size = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            Ok(_) => 0,
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(Error::io("stat", &path, e)),
        };

        let shared = Arc::new(Shared {
            path,
            file: Mutex::new(None),
            open: AtomicBool::new(false),
            size: AtomicU64::new(size),
            created: Instant::now(),
            last_used_ms: AtomicU64::new(0),
            idle_timeout,
            opened: Notify::new(),
        });

        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        tokio::spawn(run_file_worker(Arc::clone(&shared), rx));

        Ok(Self { shared, tx })
    }

    /// Appends `bytes` and returns the byte offset they were written at.
    ///
    /// Appends complete in submission order. If the caller stops waiting,
    /// the append still happens; only the answer is lost.
    pub async fn append(&self, bytes: Bytes) -> Result<u64> {
        let (response, response_rx) = oneshot::channel();

        self.tx
            .send(FileRequest::Append { bytes, response })
            .await
            .map_err(|_| Error::Shutdown("file worker has stopped".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Shutdown("file worker dropped response".to_string()))?
    }

    /// Reads exactly `length` bytes at `offset`.
    ///
    /// Fails with `Error::ShortRead` if the file ends first.
    pub async fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let file = self.shared.handle().await?;

        let buf = tokio::task::spawn_blocking(move || read_fully_at(&file, offset, length))
            .await?
            .map_err(|e| Error::io("read", &self.shared.path, e))?;
        self.shared.touch();

        if buf.len() != length {
            return Err(Error::ShortRead {
                path: self.shared.path.clone(),
                offset,
                expected: length,
                actual: buf.len(),
            });
        }
        Ok(buf)
    }

    /// Releases the OS handle after all previously queued appends finish.
    ///
    /// Safe to call repeatedly and when nothing is open. A later operation
    /// reopens the file.
    pub async fn close(&self) -> Result<()> {
        let (response, response_rx) = oneshot::channel();

        self.tx
            .send(FileRequest::Close { response })
            .await
            .map_err(|_| Error::Shutdown("file worker has stopped".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Shutdown("file worker dropped response".to_string()))?
    }

    /// Current size in bytes, including every completed append.
    pub fn size(&self) -> u64 {
        self.shared.size.load(Ordering::Acquire)
    }

    /// Whether an OS handle is currently open.
    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    /// Path of the managed file.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.shared.path)
            .field("size", &self.size())
            .field("open", &self.is_open())
            .finish()
    }
}

// =============================================================================
// RecordFile
// =============================================================================

/// A [`FileHandle`] that speaks in records instead of bytes.
///
/// The codec decides how a record is laid out; open/close, the idle timer,
/// and append ordering all come from the underlying handle.
pub struct RecordFile<C: RecordCodec> {
    handle: FileHandle,
    codec: C,
}

impl<C: RecordCodec> RecordFile<C> {
    /// Wraps `handle` with `codec`.
    pub fn new(handle: FileHandle, codec: C) -> Self {
        Self { handle, codec }
    }

    /// Encodes and appends `record`, returning its byte offset.
    pub async fn append(&self, record: &C::Record) -> Result<u64> {
        self.handle.append(self.codec.encode(record)).await
    }

    /// Reads `length` bytes at `offset` and decodes them.
    pub async fn read(&self, offset: u64, length: usize) -> Result<C::Record> {
        let bytes = self.handle.read(offset, length).await?;
        self.codec.decode(bytes)
    }

    /// Current size in bytes.
    pub fn size(&self) -> u64 {
        self.handle.size()
    }

    /// Releases the OS handle.
    pub async fn close(&self) -> Result<()> {
        self.handle.close().await
    }

    /// The underlying byte-level handle.
    pub fn handle(&self) -> &FileHandle {
        &self.handle
    }
}

// =============================================================================
// Tests
// =============================================================================
