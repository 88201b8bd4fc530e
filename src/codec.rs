//! # Record Codecs
//!
//! Both files of a chunk are append-only sequences of records; they differ
//! only in how one record is turned into bytes. [`RecordCodec`] captures that
//! difference so a single generic file manager
//! ([`RecordFile`](crate::file_handle::RecordFile)) can serve both.
//!
//! ## Index Format
//!
//! Fixed 32-byte little-endian records:
//!
//! ```text
//! ┌────────────┬──────────┬──────────────┬─────────────┬──────────────┐
//! │ offset (8) │ len (4)  │ timestamp (8)│ local (4)   │ global (8)   │
//! └────────────┴──────────┴──────────────┴─────────────┴──────────────┘
//!  0            8          12             20            24           32
//! ```
//!
//! Because every record has the same width, record `n` of a chunk lives at
//! byte `n * 32` and the record count is `file_size / 32`. A file size that
//! is not a multiple of 32 means a write was torn.
//!
//! ## Log Format
//!
//! Raw payload bytes followed by a `\n` delimiter. The delimiter only exists
//! so the file can be inspected as text; it is never counted in a record's
//! length and never returned by reads.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::types::IndexRecord;

// =============================================================================
// Constants
// =============================================================================

/// Width in bytes of one serialized [`IndexRecord`].
pub const INDEX_RECORD_SIZE: usize = 32;

/// Byte appended after every payload in a log file.
pub const LOG_DELIMITER: u8 = b'\n';

// =============================================================================
// Codec Trait
// =============================================================================

/// How one record type is laid out in an append-only file.
///
/// # Rust Pattern: Associated Types
///
/// `type Record` lets each codec name the value it produces, so
/// `RecordFile<IndexCodec>::read` returns an `IndexRecord` and
/// `RecordFile<LogCodec>::read` returns payload `Bytes` without any casting.
pub trait RecordCodec: Send + Sync + 'static {
    /// The decoded value.
    type Record;

    /// Serializes `record` into the exact bytes appended to the file.
    fn encode(&self, record: &Self::Record) -> Bytes;

    /// Decodes bytes previously read back from the file.
    fn decode(&self, bytes: Vec<u8>) -> Result<Self::Record>;
}

// =============================================================================
// Index Codec
// =============================================================================

/// Codec for fixed-width index records.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexCodec;

impl RecordCodec for IndexCodec {
    type Record = IndexRecord;

    fn encode(&self, record: &IndexRecord) -> Bytes {
        let mut buf = BytesMut::with_capacity(INDEX_RECORD_SIZE);
        buf.put_u64_le(record.offset);
        buf.put_u32_le(record.length);
        buf.put_u64_le(record.timestamp);
        buf.put_u32_le(record.local_index);
        buf.put_u64_le(record.global_index);
        buf.freeze()
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<IndexRecord> {
        decode_index_record(&bytes)
    }
}

/// Decodes one index record from exactly [`INDEX_RECORD_SIZE`] bytes.
///
/// Returns `Error::Corruption` with an empty path for the wrong width; callers
/// that know the file replace it with a more specific error.
pub fn decode_index_record(bytes: &[u8]) -> Result<IndexRecord> {
    if bytes.len() != INDEX_RECORD_SIZE {
        return Err(Error::Corruption {
            path: Default::default(),
            reason: format!(
                "index record must be {} bytes, got {}",
                INDEX_RECORD_SIZE,
                bytes.len()
            ),
        });
    }

    let u64_at = |at: usize| {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[at..at + 8]);
        u64::from_le_bytes(raw)
    };
    let u32_at = |at: usize| {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[at..at + 4]);
        u32::from_le_bytes(raw)
    };

    Ok(IndexRecord {
        offset: u64_at(0),
        length: u32_at(8),
        timestamp: u64_at(12),
        local_index: u32_at(20),
        global_index: u64_at(24),
    })
}

// =============================================================================
// Log Codec
// =============================================================================

/// Codec for raw payloads with a trailing delimiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCodec;

impl RecordCodec for LogCodec {
    type Record = Bytes;

    fn encode(&self, payload: &Bytes) -> Bytes {
        let mut buf = BytesMut::with_capacity(payload.len() + 1);
        buf.put_slice(payload);
        buf.put_u8(LOG_DELIMITER);
        buf.freeze()
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<Bytes> {
        Ok(Bytes::from(bytes))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Returns the current time in milliseconds since Unix epoch.
pub fn current_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndexRecord {
        IndexRecord {
            offset: 0x0102_0304_0506_0708,
            length: 42,
            timestamp: 1_700_000_000_123,
            local_index: 7,
            global_index: 10_007,
        }
    }

    #[test]
    fn test_index_layout_is_little_endian_and_fixed_width() {
        let bytes = IndexCodec.encode(&sample());
        assert_eq!(bytes.len(), INDEX_RECORD_SIZE);

        // offset occupies bytes 0..8, least significant byte first
        assert_eq!(&bytes[0..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
        // length at 8..12
        assert_eq!(&bytes[8..12], &42u32.to_le_bytes());
        // local index at 20..24, global index at 24..32
        assert_eq!(&bytes[20..24], &7u32.to_le_bytes());
        assert_eq!(&bytes[24..32], &10_007u64.to_le_bytes());

        let decoded = IndexCodec.decode(bytes.to_vec()).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_index_decode_rejects_wrong_width() {
        let err = IndexCodec.decode(vec![0u8; 31]).unwrap_err();
        assert!(matches!(err, Error::Corruption { .. }));
    }

    #[test]
    fn test_log_codec_appends_delimiter() {
        let encoded = LogCodec.encode(&Bytes::from_static(b"hello"));
        assert_eq!(&encoded[..], b"hello\n");

        let empty = LogCodec.encode(&Bytes::new());
        assert_eq!(&empty[..], b"\n");
    }

    #[test]
    fn test_current_time_is_recent() {
        // 2020-01-01 in ms; anything earlier means the clock helper is broken
        assert!(current_time_ms() > 1_577_836_800_000);
    }
}
