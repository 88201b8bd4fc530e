//! # Topic Storage Engine
//!
//! A topic is a directory of fixed-capacity chunks. Chunk `n` holds offsets
//! `n * records_per_file .. (n + 1) * records_per_file` and is stored as two
//! files:
//!
//! ```text
//! data/orders/
//! ├── index-0.bin   (records_per_file * 32 bytes: full)
//! ├── log-0.log
//! ├── index-1.bin   (partial: only the highest chunk may be)
//! └── log-1.log
//! ```
//!
//! ## Write Path
//!
//! All writes for a topic go through one bounded queue drained by a single
//! worker task:
//!
//! ```text
//!   write() ──┐
//!   write() ──┼─► mpsc ─► worker: log.write_log ─► index.write_record
//!   write() ──┘                   ─► length += 1 ─► respond ─► bus.publish
//! ```
//!
//! Offsets are therefore assigned in queue order, and the publish for offset
//! `N` always happens before the publish for `N + 1`. A failed write answers
//! its caller with the error, leaves `length` alone, publishes nothing, and
//! the worker moves on to the next request.
//!
//! ## Read Path
//!
//! [`Topic::read`] serves only records that already exist. It returns a
//! [`TopicReader`] that pulls one record per call, opening chunks as it
//! crosses into them. Dropping the reader cancels it.
//!
//! ## Recovery
//!
//! [`Topic::open`] rebuilds `length` from the index files before accepting
//! any operation. Any inconsistency fails construction; the topic is never
//! exposed half-recovered.

use std::collections::HashMap;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::try_join_all;
use futures::Stream;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info, warn};

use crate::bus::EventBus;
use crate::codec::{decode_index_record, INDEX_RECORD_SIZE};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::index_file::IndexFile;
use crate::log_file::LogFile;
use crate::subscription::LiveSubscription;
use crate::types::{IndexRecord, Record, TopicName};

const RECORD_WIDTH: u64 = INDEX_RECORD_SIZE as u64;

// =============================================================================
// File Naming
// =============================================================================

/// Name of chunk `chunk`'s index file.
pub fn index_file_name(chunk: u64) -> String {
    format!("index-{chunk}.bin")
}

/// Name of chunk `chunk`'s log file.
pub fn log_file_name(chunk: u64) -> String {
    format!("log-{chunk}.log")
}

/// Extracts the chunk number from an index file name.
fn parse_index_file_name(name: &str) -> Option<u64> {
    let digits = name.strip_prefix("index-")?.strip_suffix(".bin")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// =============================================================================
// Recovery
// =============================================================================

/// Rebuilds a topic's length from the index files in `dir`.
///
/// Checks, in order:
/// - chunk numbers run 0, 1, 2, ... with no gaps
/// - every chunk but the highest holds exactly `records_per_file` records
/// - the highest chunk holds whole records, at most `records_per_file`
/// - the highest chunk's last record carries the expected global index and
///   points inside its log file
async fn recover_length(name: &TopicName, dir: &Path, records_per_file: u64) -> Result<u64> {
    let recovery = |reason: String| Error::Recovery {
        topic: name.to_string(),
        reason,
    };

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::io("read_dir", dir, e))?;

    let mut chunks: Vec<(u64, u64)> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io("read_dir", dir, e))?
    {
        let file_name = entry.file_name();
        let Some(chunk) = file_name.to_str().and_then(parse_index_file_name) else {
            continue;
        };
        let size = entry
            .metadata()
            .await
            .map_err(|e| Error::io("stat", entry.path(), e))?
            .len();
        chunks.push((chunk, size));
    }

    // numeric order, so index-10 sorts after index-9
    chunks.sort_unstable();

    let Some(&(highest, highest_size)) = chunks.last() else {
        return Ok(0);
    };

    let full_size = records_per_file * RECORD_WIDTH;
    for (position, &(chunk, size)) in chunks.iter().enumerate() {
        let position = position as u64;
        if chunk != position {
            return Err(recovery(format!("{} is missing", index_file_name(position))));
        }
        if chunk != highest && size != full_size {
            return Err(recovery(format!(
                "{} has {size} bytes, expected {full_size}",
                index_file_name(chunk)
            )));
        }
    }

    if highest_size % RECORD_WIDTH != 0 {
        return Err(recovery(format!(
            "{} has {highest_size} bytes, not a multiple of {RECORD_WIDTH} (torn write)",
            index_file_name(highest)
        )));
    }
    if highest_size > full_size {
        return Err(recovery(format!(
            "{} has {highest_size} bytes, more than {full_size}",
            index_file_name(highest)
        )));
    }

    let records = highest_size / RECORD_WIDTH;
    let length = highest * records_per_file + records;

    if records > 0 {
        let last = read_last_index_record(&dir.join(index_file_name(highest)), highest_size).await?;
        if last.global_index != length - 1 {
            return Err(recovery(format!(
                "last record of {} has global index {}, expected {}",
                index_file_name(highest),
                last.global_index,
                length - 1
            )));
        }

        let log_path = dir.join(log_file_name(highest));
        let log_size = match tokio::fs::metadata(&log_path).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(Error::io("stat", &log_path, e)),
        };
        let needed = last.offset + u64::from(last.length);
        if log_size < needed {
            return Err(recovery(format!(
                "{} has {log_size} bytes but its index references {needed}",
                log_file_name(highest)
            )));
        }
    }

    Ok(length)
}

async fn read_last_index_record(path: &Path, size: u64) -> Result<IndexRecord> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::io("open", path, e))?;
    file.seek(SeekFrom::Start(size - RECORD_WIDTH))
        .await
        .map_err(|e| Error::io("seek", path, e))?;

    let mut buf = [0u8; INDEX_RECORD_SIZE];
    file.read_exact(&mut buf)
        .await
        .map_err(|e| Error::io("read", path, e))?;
    decode_index_record(&buf)
}

// =============================================================================
// Shared State
// =============================================================================

/// The log and index file of one chunk.
struct Chunk {
    number: u64,
    index: IndexFile,
    log: LogFile,
}

impl Chunk {
    async fn close(&self) -> Result<()> {
        self.index.close().await?;
        self.log.close().await
    }
}

/// State shared by topic handles, the writer task, and readers.
struct TopicState {
    name: TopicName,
    dir: PathBuf,
    records_per_file: u64,
    idle_timeout: Duration,
    queue_capacity: usize,

    /// Records written so far. Only the writer task stores to it.
    length: AtomicU64,

    /// Chunk managers opened so far, kept for the life of the topic.
    chunks: Mutex<HashMap<u64, Arc<Chunk>>>,

    bus: EventBus,
}

impl TopicState {
    /// Returns chunk `number`, creating its managers on first use.
    async fn chunk(&self, number: u64) -> Result<Arc<Chunk>> {
        let mut chunks = self.chunks.lock().await;
        if let Some(chunk) = chunks.get(&number) {
            return Ok(Arc::clone(chunk));
        }

        let index = IndexFile::open(
            self.dir.join(index_file_name(number)),
            number,
            self.records_per_file,
            self.idle_timeout,
            self.queue_capacity,
        )
        .await?;
        let log = LogFile::open(
            self.dir.join(log_file_name(number)),
            self.idle_timeout,
            self.queue_capacity,
        )
        .await?;

        debug!(topic = %self.name, chunk = number, "opened chunk");

        let chunk = Arc::new(Chunk { number, index, log });
        chunks.insert(number, Arc::clone(&chunk));
        Ok(chunk)
    }

    /// Writes one record at the current tail and advances `length`.
    ///
    /// Only the writer task calls this.
    async fn append(&self, payload: Bytes) -> Result<Record> {
        let offset = self.length.load(Ordering::Acquire);
        let chunk = self.chunk(offset / self.records_per_file).await?;

        let range = chunk.log.write_log(payload.clone()).await?;
        let entry = chunk.index.write_record(range).await?;
        if entry.global_index != offset {
            return Err(Error::Corruption {
                path: chunk.index.path().to_path_buf(),
                reason: format!(
                    "record written with global index {}, expected {offset}",
                    entry.global_index
                ),
            });
        }

        self.length.store(offset + 1, Ordering::Release);

        Ok(Record {
            timestamp: entry.timestamp,
            offset,
            value: payload,
        })
    }

    fn publish(&self, record: Record) {
        self.bus.publish(self.name.as_str(), record);
    }
}

// =============================================================================
// Writer Task
// =============================================================================

enum WriteRequest {
    /// Write one payload.
    Append {
        payload: Bytes,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Write several payloads back to back.
    AppendMany {
        payloads: Vec<Bytes>,
        response: oneshot::Sender<Result<Vec<u64>>>,
    },
}

/// Drains the topic's write queue until every [`Topic`] handle is dropped.
async fn run_topic_writer(state: Arc<TopicState>, mut rx: mpsc::Receiver<WriteRequest>) {
    while let Some(request) = rx.recv().await {
        match request {
            WriteRequest::Append { payload, response } => match state.append(payload).await {
                Ok(record) => {
                    let _ = response.send(Ok(record.offset));
                    state.publish(record);
                }
                Err(err) => {
                    warn!(topic = %state.name, error = %err, "write failed");
                    let _ = response.send(Err(err));
                }
            },
            WriteRequest::AppendMany { payloads, response } => {
                let mut offsets = Vec::with_capacity(payloads.len());
                let mut failure = None;
                for payload in payloads {
                    match state.append(payload).await {
                        Ok(record) => {
                            offsets.push(record.offset);
                            state.publish(record);
                        }
                        Err(err) => {
                            warn!(
                                topic = %state.name,
                                written = offsets.len(),
                                error = %err,
                                "multi-record write failed"
                            );
                            failure = Some(err);
                            break;
                        }
                    }
                }
                let _ = response.send(match failure {
                    Some(err) => Err(err),
                    None => Ok(offsets),
                });
            }
        }
    }

    debug!(topic = %state.name, "topic writer stopped");
}

// =============================================================================
// Topic
// =============================================================================

/// Handle to one topic.
///
/// Cheap to clone; every clone feeds the same write queue and sees the same
/// length.
///
/// # Example
///
/// ```rust,ignore
/// let topic = Topic::open(TopicName::new("orders")?, &config, bus).await?;
///
/// let offset = topic.write(&b"first"[..]).await?;
/// assert_eq!(offset, 0);
///
/// let mut reader = topic.read(0, topic.length())?;
/// while let Some(record) = reader.next().await {
///     let record = record?;
///     println!("{}: {:?}", record.offset, record.value);
/// }
/// ```
#[derive(Clone)]
pub struct Topic {
    state: Arc<TopicState>,
    write_tx: mpsc::Sender<WriteRequest>,
}

impl Topic {
    /// Opens (or creates) the topic `name` under `config.data_dir`.
    ///
    /// Creates the directory if needed and recovers the length from the
    /// index files. Fails with `Error::InvalidConfig` for an unusable
    /// configuration and with `Error::Recovery` if the files are
    /// inconsistent.
    pub async fn open(name: TopicName, config: &StoreConfig, bus: EventBus) -> Result<Self> {
        config.validate()?;

        let dir = config.data_dir.join(name.as_str());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::io("create_dir", &dir, e))?;

        let length = match recover_length(&name, &dir, config.records_per_file).await {
            Ok(length) => length,
            Err(err) => {
                error!(topic = %name, error = %err, "topic recovery failed");
                return Err(err);
            }
        };

        info!(topic = %name, length, dir = %dir.display(), "topic ready");

        let state = Arc::new(TopicState {
            name,
            dir,
            records_per_file: config.records_per_file,
            idle_timeout: config.idle_timeout(),
            queue_capacity: config.write_queue_capacity,
            length: AtomicU64::new(length),
            chunks: Mutex::new(HashMap::new()),
            bus,
        });

        let (write_tx, write_rx) = mpsc::channel(config.write_queue_capacity.max(1));
        tokio::spawn(run_topic_writer(Arc::clone(&state), write_rx));

        Ok(Self { state, write_tx })
    }

    /// Appends `payload` and returns its offset.
    ///
    /// Resolves once the record is in both chunk files and `length` includes
    /// it. The record is then published to live subscribers.
    pub async fn write(&self, payload: impl Into<Bytes>) -> Result<u64> {
        let (response, response_rx) = oneshot::channel();

        self.write_tx
            .send(WriteRequest::Append {
                payload: payload.into(),
                response,
            })
            .await
            .map_err(|_| Error::Shutdown("topic writer has stopped".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Shutdown("topic writer dropped response".to_string()))?
    }

    /// Appends `payloads` back to back and returns their offsets.
    ///
    /// No other write is interleaved, so the offsets are contiguous. This is
    /// not a transaction: if one payload fails, the ones before it stay
    /// written and the error is returned.
    pub async fn write_many(&self, payloads: Vec<Bytes>) -> Result<Vec<u64>> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let (response, response_rx) = oneshot::channel();

        self.write_tx
            .send(WriteRequest::AppendMany { payloads, response })
            .await
            .map_err(|_| Error::Shutdown("topic writer has stopped".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Shutdown("topic writer dropped response".to_string()))?
    }

    /// Returns a reader over `count` records starting at `offset`.
    ///
    /// Fails with `Error::OutOfRange`, before touching any file, if the range
    /// reaches past the current length. Callers that want to wait for new
    /// records subscribe instead.
    pub fn read(&self, offset: u64, count: u64) -> Result<TopicReader> {
        let length = self.length();
        let end = offset
            .checked_add(count)
            .filter(|&end| end <= length)
            .ok_or(Error::OutOfRange {
                offset,
                count,
                length,
            })?;

        Ok(TopicReader {
            state: Arc::clone(&self.state),
            next: offset,
            end,
            current: None,
            done: false,
        })
    }

    /// Number of records written, counting only completed writes.
    pub fn length(&self) -> u64 {
        self.state.length.load(Ordering::Acquire)
    }

    /// Attaches a live listener to this topic's bus channel.
    pub fn subscribe(&self) -> LiveSubscription {
        self.state.bus.subscribe(self.state.name.as_str())
    }

    /// Live listeners currently attached to this topic.
    pub fn subscriber_count(&self) -> usize {
        self.state.bus.subscriber_count(self.state.name.as_str())
    }

    /// Closes the files of every chunk opened so far.
    ///
    /// The topic stays usable; the next operation reopens what it needs.
    pub async fn close(&self) -> Result<()> {
        let chunks: Vec<Arc<Chunk>> = self.state.chunks.lock().await.values().cloned().collect();
        try_join_all(chunks.iter().map(|chunk| chunk.close())).await?;
        debug!(topic = %self.state.name, chunks = chunks.len(), "closed topic files");
        Ok(())
    }

    /// The sanitized topic name.
    pub fn name(&self) -> &TopicName {
        &self.state.name
    }

    /// Directory holding the chunk files.
    pub fn dir(&self) -> &Path {
        &self.state.dir
    }

    /// Chunk capacity in records.
    pub fn records_per_file(&self) -> u64 {
        self.state.records_per_file
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.state.name)
            .field("length", &self.length())
            .finish()
    }
}

// =============================================================================
// TopicReader
// =============================================================================

/// Pull-based reader over a fixed range of a topic.
///
/// Yields each record once, in offset order. The first error ends the
/// sequence. Dropping the reader stops it; nothing further is read.
///
/// # Example
///
/// ```rust,ignore
/// let mut reader = topic.read(10, 5)?;
/// while let Some(record) = reader.next().await {
///     let record = record?;
///     handle(record.offset, record.value);
/// }
/// ```
pub struct TopicReader {
    state: Arc<TopicState>,
    next: u64,
    end: u64,
    current: Option<Arc<Chunk>>,
    done: bool,
}

impl TopicReader {
    /// Reads the next record, or returns `None` once the range is exhausted.
    pub async fn next(&mut self) -> Option<Result<Record>> {
        if self.done || self.next >= self.end {
            return None;
        }

        match self.read_at(self.next).await {
            Ok(record) => {
                self.next += 1;
                Some(Ok(record))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }

    /// Records not yet yielded.
    pub fn remaining(&self) -> u64 {
        if self.done {
            0
        } else {
            self.end - self.next
        }
    }

    /// Converts the reader into a `Stream`.
    pub fn into_stream(self) -> impl Stream<Item = Result<Record>> {
        futures::stream::unfold(self, |mut reader| async move {
            reader.next().await.map(|item| (item, reader))
        })
    }

    async fn read_at(&mut self, offset: u64) -> Result<Record> {
        let records_per_file = self.state.records_per_file;
        let number = offset / records_per_file;

        let chunk = match &self.current {
            Some(chunk) if chunk.number == number => Arc::clone(chunk),
            _ => {
                let chunk = self.state.chunk(number).await?;
                self.current = Some(Arc::clone(&chunk));
                chunk
            }
        };

        // records_per_file fits in u32, so the remainder does too
        let local = (offset % records_per_file) as u32;
        let entry = chunk.index.read_record(local).await?;
        if entry.global_index != offset {
            return Err(Error::Corruption {
                path: chunk.index.path().to_path_buf(),
                reason: format!(
                    "record {local} has global index {}, expected {offset}",
                    entry.global_index
                ),
            });
        }

        let value = chunk.log.read_log(entry.log_range()).await?;
        Ok(Record {
            timestamp: entry.timestamp,
            offset,
            value,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn config(dir: &tempfile::TempDir, records_per_file: u64) -> StoreConfig {
        StoreConfig::default()
            .with_data_dir(dir.path())
            .with_records_per_file(records_per_file)
    }

    async fn open(dir: &tempfile::TempDir, records_per_file: u64) -> Topic {
        Topic::open(
            TopicName::new("orders").unwrap(),
            &config(dir, records_per_file),
            EventBus::new(64),
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(index_file_name(12), "index-12.bin");
        assert_eq!(log_file_name(0), "log-0.log");

        assert_eq!(parse_index_file_name("index-0.bin"), Some(0));
        assert_eq!(parse_index_file_name("index-123.bin"), Some(123));
        assert_eq!(parse_index_file_name("index-.bin"), None);
        assert_eq!(parse_index_file_name("index-+1.bin"), None);
        assert_eq!(parse_index_file_name("log-0.log"), None);
        assert_eq!(parse_index_file_name("index-1.bin.tmp"), None);
    }

    #[tokio::test]
    async fn test_new_topic_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let topic = open(&dir, 10).await;

        assert_eq!(topic.length(), 0);
        assert!(topic.dir().is_dir());
        assert_eq!(topic.name().as_str(), "orders");
    }

    #[tokio::test]
    async fn test_chunk_layout_example() {
        let dir = tempfile::TempDir::new().unwrap();
        let topic = open(&dir, 2).await;

        assert_eq!(topic.write(&b"a"[..]).await.unwrap(), 0);
        assert_eq!(topic.write(&b"b"[..]).await.unwrap(), 1);
        assert_eq!(topic.write(&b"c"[..]).await.unwrap(), 2);
        assert_eq!(topic.length(), 3);

        let chunk0 = std::fs::metadata(topic.dir().join("index-0.bin")).unwrap();
        let chunk1 = std::fs::metadata(topic.dir().join("index-1.bin")).unwrap();
        assert_eq!(chunk0.len(), 64);
        assert_eq!(chunk1.len(), 32);
        assert_eq!(std::fs::read(topic.dir().join("log-1.log")).unwrap(), b"c\n");

        let records: Vec<Record> = topic.read(0, 3).unwrap().into_stream().try_collect().await.unwrap();
        let values: Vec<(u64, &[u8])> = records.iter().map(|r| (r.offset, &r.value[..])).collect();
        assert_eq!(values, vec![(0, &b"a"[..]), (1, &b"b"[..]), (2, &b"c"[..])]);

        assert!(matches!(
            topic.read(0, 4),
            Err(Error::OutOfRange { length: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_read_overflow_is_out_of_range() {
        let dir = tempfile::TempDir::new().unwrap();
        let topic = open(&dir, 10).await;
        topic.write(&b"x"[..]).await.unwrap();

        assert!(matches!(
            topic.read(1, u64::MAX),
            Err(Error::OutOfRange { .. })
        ));
        // empty range at the tail is fine
        let mut reader = topic.read(1, 0).unwrap();
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_write_many_is_contiguous() {
        let dir = tempfile::TempDir::new().unwrap();
        let topic = open(&dir, 3).await;
        topic.write(&b"first"[..]).await.unwrap();

        let payloads = (0..5).map(|i| Bytes::from(format!("batch-{i}"))).collect();
        let offsets = topic.write_many(payloads).await.unwrap();
        assert_eq!(offsets, vec![1, 2, 3, 4, 5]);
        assert_eq!(topic.length(), 6);

        assert!(topic.write_many(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_publishes_after_length_advances() {
        let dir = tempfile::TempDir::new().unwrap();
        let topic = open(&dir, 10).await;
        let mut live = topic.subscribe();

        topic.write(&b"hello"[..]).await.unwrap();

        let record = live.next().await.unwrap().unwrap();
        assert_eq!(record.offset, 0);
        assert_eq!(&record.value[..], b"hello");
        assert!(record.timestamp > 0);
        assert_eq!(topic.length(), 1);
    }

    #[tokio::test]
    async fn test_recovery_after_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let topic = open(&dir, 3).await;
            for i in 0..7 {
                topic.write(Bytes::from(format!("v{i}"))).await.unwrap();
            }
            topic.close().await.unwrap();
        }

        let topic = open(&dir, 3).await;
        assert_eq!(topic.length(), 7);
        assert_eq!(topic.write(&b"v7"[..]).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_recovery_rejects_missing_chunk() {
        let dir = tempfile::TempDir::new().unwrap();
        let topic_dir = dir.path().join("orders");
        std::fs::create_dir_all(&topic_dir).unwrap();
        std::fs::write(topic_dir.join("index-1.bin"), b"").unwrap();

        let err = Topic::open(
            TopicName::new("orders").unwrap(),
            &config(&dir, 2),
            EventBus::new(8),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Recovery { .. }));
    }

    #[tokio::test]
    async fn test_recovery_rejects_short_log() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let topic = open(&dir, 10).await;
            topic.write(&b"payload"[..]).await.unwrap();
            topic.close().await.unwrap();
        }
        let log = dir.path().join("orders").join("log-0.log");
        std::fs::write(&log, b"pay").unwrap();

        let err = Topic::open(
            TopicName::new("orders").unwrap(),
            &config(&dir, 10),
            EventBus::new(8),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Recovery { .. }));
    }

    #[tokio::test]
    async fn test_open_rejects_zero_records_per_file() {
        let dir = tempfile::TempDir::new().unwrap();

        let err = Topic::open(
            TopicName::new("orders").unwrap(),
            &config(&dir, 0),
            EventBus::new(8),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)), "{err:?}");
        assert!(!dir.path().join("orders").exists());
    }

    #[tokio::test]
    async fn test_close_without_chunks() {
        let dir = tempfile::TempDir::new().unwrap();
        let topic = open(&dir, 10).await;
        topic.close().await.unwrap();
        topic.close().await.unwrap();
    }
}
