//! # Domain Types for SpiteLog
//!
//! This module defines the core types shared by every layer of the engine:
//! topic names, records handed to producers and consumers, and the metadata
//! stored in index files.
//!
//! ## Offsets
//!
//! Offsets are plain `u64` values: zero-based, contiguous, never reused.
//! A topic's length is the offset one past its last written record.
//!
//! ## Invariants
//!
//! - [`IndexRecord::global_index`] `= chunk_number * records_per_file + local_index`
//! - [`TopicName`] is always filesystem safe: it is used verbatim as a
//!   directory name and as the event bus key

use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};

// =============================================================================
// Topic Name
// =============================================================================

/// Characters that may not appear in a topic directory name.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replacement for reserved characters.
const REPLACEMENT: char = '!';

/// A filesystem-safe topic name.
///
/// # Rust Pattern: Validated Newtype
///
/// The only way to build a `TopicName` is [`TopicName::new`], which sanitizes
/// the input. Code that receives a `TopicName` never has to re-check it.
///
/// # Example
///
/// ```rust
/// use spitelog::types::TopicName;
///
/// let name = TopicName::new("orders/eu").unwrap();
/// assert_eq!(name.as_str(), "orders!eu");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicName(String);

impl TopicName {
    /// Sanitizes `raw` into a name usable as a directory.
    ///
    /// Reserved path characters and control characters become `!` and
    /// surrounding whitespace is trimmed. Names that end up empty, `.` or `..`
    /// are rejected.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref();
        let sanitized: String = raw
            .trim()
            .chars()
            .map(|c| {
                if c.is_control() || RESERVED_CHARS.contains(&c) {
                    REPLACEMENT
                } else {
                    c
                }
            })
            .collect();

        if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
            return Err(Error::InvalidTopicName(raw.to_string()));
        }
        Ok(Self(sanitized))
    }

    /// Returns the sanitized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TopicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Records
// =============================================================================

/// One record of a topic, as seen by consumers.
///
/// The same type is produced by historical reads and delivered by live
/// subscriptions, so consumers never care which path a record took.
/// `value` is a [`Bytes`] so broadcasting to many subscribers only bumps a
/// reference count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Write time, Unix milliseconds.
    pub timestamp: u64,

    /// Global offset within the topic.
    pub offset: u64,

    /// The payload exactly as written.
    pub value: Bytes,
}

/// Byte range of one payload inside a chunk's log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRange {
    /// Byte offset of the payload in the log file.
    pub offset: u64,

    /// Payload length (the trailing delimiter is not counted).
    pub length: u32,
}

/// Fixed-width entry of an index file.
///
/// Serialized little-endian as
/// `offset (8) | length (4) | timestamp (8) | local_index (4) | global_index (8)`,
/// see [`crate::codec::IndexCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    /// Byte offset of the payload in the chunk's log file.
    pub offset: u64,

    /// Payload length in bytes.
    pub length: u32,

    /// Write time, Unix milliseconds.
    pub timestamp: u64,

    /// Position of this record within its chunk.
    pub local_index: u32,

    /// Topic-wide offset.
    pub global_index: u64,
}

impl IndexRecord {
    /// The log range this entry points at.
    pub fn log_range(&self) -> LogRange {
        LogRange {
            offset: self.offset,
            length: self.length,
        }
    }
}

// =============================================================================
// Poll Result
// =============================================================================

/// Answer to a long-poll: a batch of records plus where to poll next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    /// Records in offset order. May be empty when the poll timed out.
    pub records: Vec<Record>,

    /// Offset to request on the next poll.
    pub next_offset: u64,
}

impl PollResult {
    /// Builds a result for a poll that started at `requested`.
    pub fn new(requested: u64, records: Vec<Record>) -> Self {
        let next_offset = records
            .last()
            .map(|record| record.offset + 1)
            .unwrap_or(requested);
        Self {
            records,
            next_offset,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
