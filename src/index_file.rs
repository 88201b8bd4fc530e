//! # Index File Manager
//!
//! Maps the records of one chunk to byte ranges in its log file. Records are
//! fixed width ([`INDEX_RECORD_SIZE`] bytes), so:
//!
//! - the local index of the next record is `file_size / 32`
//! - record `n` is read from byte `n * 32`
//! - `global_index = chunk_number * records_per_file + local_index`
//!
//! A size that is not a multiple of 32 means an earlier write was torn; the
//! manager refuses to append after it rather than misnumbering records.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::codec::{current_time_ms, IndexCodec, INDEX_RECORD_SIZE};
use crate::error::{Error, Result};
use crate::file_handle::{FileHandle, RecordFile};
use crate::types::{IndexRecord, LogRange};

const RECORD_WIDTH: u64 = INDEX_RECORD_SIZE as u64;

/// Index for one chunk.
pub struct IndexFile {
    file: RecordFile<IndexCodec>,
    chunk_number: u64,
    records_per_file: u64,

    /// Held across "compute local index, append" so numbering stays exact.
    write_lock: Mutex<()>,
}

impl IndexFile {
    /// Creates the manager for chunk `chunk_number`'s index at `path`.
    pub async fn open(
        path: impl Into<PathBuf>,
        chunk_number: u64,
        records_per_file: u64,
        idle_timeout: Duration,
        queue_capacity: usize,
    ) -> Result<Self> {
        let handle = FileHandle::open(path, idle_timeout, queue_capacity).await?;
        Ok(Self {
            file: RecordFile::new(handle, IndexCodec),
            chunk_number,
            records_per_file,
            write_lock: Mutex::new(()),
        })
    }

    /// Appends an entry for `range` stamped with the current time.
    pub async fn write_record(&self, range: LogRange) -> Result<IndexRecord> {
        let _guard = self.write_lock.lock().await;

        let size = self.file.size();
        if size % RECORD_WIDTH != 0 {
            return Err(self.corruption(format!(
                "size {size} is not a multiple of {RECORD_WIDTH}"
            )));
        }

        let local = size / RECORD_WIDTH;
        if local >= self.records_per_file {
            return Err(self.corruption(format!(
                "chunk {} is full ({} records)",
                self.chunk_number, self.records_per_file
            )));
        }

        let record = IndexRecord {
            offset: range.offset,
            length: range.length,
            timestamp: current_time_ms(),
            // records_per_file is validated to fit in u32
            local_index: local as u32,
            global_index: self.chunk_number * self.records_per_file + local,
        };

        let at = self.file.append(&record).await?;
        if at != size {
            return Err(self.corruption(format!(
                "record {local} landed at byte {at}, expected {size}"
            )));
        }
        Ok(record)
    }

    /// Reads the record at `local_index`.
    ///
    /// An index at or past the record count fails with `Error::ShortRead`.
    pub async fn read_record(&self, local_index: u32) -> Result<IndexRecord> {
        let at = u64::from(local_index) * RECORD_WIDTH;
        self.file
            .read(at, INDEX_RECORD_SIZE)
            .await
            .map_err(|err| match err {
                Error::Corruption { reason, .. } => self.corruption(reason),
                other => other,
            })
    }

    /// Complete records in the file.
    pub fn record_count(&self) -> u64 {
        self.file.size() / RECORD_WIDTH
    }

    /// Chunk this index belongs to.
    pub fn chunk_number(&self) -> u64 {
        self.chunk_number
    }

    /// Path of the index file.
    pub fn path(&self) -> &Path {
        self.file.handle().path()
    }

    /// Releases the OS handle.
    pub async fn close(&self) -> Result<()> {
        self.file.close().await
    }

    fn corruption(&self, reason: String) -> Error {
        Error::Corruption {
            path: self.path().to_path_buf(),
            reason,
        }
    }
}
