//! # Log File Manager
//!
//! Stores raw payloads for one chunk. A payload is appended followed by a
//! newline; the returned [`LogRange`] covers the payload only, so reading it
//! back yields exactly what was written.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

use crate::codec::LogCodec;
use crate::error::{Error, Result};
use crate::file_handle::{FileHandle, RecordFile};
use crate::types::LogRange;

/// Payload storage for one chunk.
pub struct LogFile {
    file: RecordFile<LogCodec>,
}

impl LogFile {
    /// Creates the manager for the log file at `path`.
    pub async fn open(
        path: impl Into<PathBuf>,
        idle_timeout: Duration,
        queue_capacity: usize,
    ) -> Result<Self> {
        let handle = FileHandle::open(path, idle_timeout, queue_capacity).await?;
        Ok(Self {
            file: RecordFile::new(handle, LogCodec),
        })
    }

    /// Appends `payload` and returns where it landed.
    pub async fn write_log(&self, payload: Bytes) -> Result<LogRange> {
        let length = u32::try_from(payload.len()).map_err(|_| Error::Corruption {
            path: self.file.handle().path().to_path_buf(),
            reason: format!("payload of {} bytes does not fit a log range", payload.len()),
        })?;
        let offset = self.file.append(&payload).await?;
        Ok(LogRange { offset, length })
    }

    /// Reads the payload at `range`.
    pub async fn read_log(&self, range: LogRange) -> Result<Bytes> {
        self.file.read(range.offset, range.length as usize).await
    }

    /// Bytes in the file, delimiters included.
    pub fn size(&self) -> u64 {
        self.file.size()
    }

    /// Releases the OS handle.
    pub async fn close(&self) -> Result<()> {
        self.file.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn log_file(dir: &tempfile::TempDir) -> LogFile {
        LogFile::open(dir.path().join("log-0.log"), Duration::from_secs(1), 16)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_log_excludes_delimiter_from_length() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = log_file(&dir).await;

        let first = log.write_log(Bytes::from_static(b"a")).await.unwrap();
        let second = log.write_log(Bytes::from_static(b"bc")).await.unwrap();

        assert_eq!(first, LogRange { offset: 0, length: 1 });
        assert_eq!(second, LogRange { offset: 2, length: 2 });
        assert_eq!(log.size(), 5);

        let on_disk = std::fs::read(dir.path().join("log-0.log")).unwrap();
        assert_eq!(on_disk, b"a\nbc\n");
    }

    #[tokio::test]
    async fn test_read_log_returns_exact_payload() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = log_file(&dir).await;

        // payloads containing the delimiter survive untouched
        let payload = Bytes::from_static(b"line one\nline two");
        let range = log.write_log(payload.clone()).await.unwrap();
        assert_eq!(log.read_log(range).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_empty_payload() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = log_file(&dir).await;

        let range = log.write_log(Bytes::new()).await.unwrap();
        assert_eq!(range.length, 0);
        assert!(log.read_log(range).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_past_end_is_short_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = log_file(&dir).await;
        log.write_log(Bytes::from_static(b"xyz")).await.unwrap();

        let err = log
            .read_log(LogRange {
                offset: 2,
                length: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ShortRead { .. }));
    }
}
