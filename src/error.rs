//! # Error Handling for SpiteLog
//!
//! This module defines the error types used throughout SpiteLog. A single
//! error enum ([`Error`]) represents every failure mode of the storage engine,
//! which keeps signatures simple for the request layer sitting on top of it.
//!
//! ## Rust Pattern: thiserror
//!
//! We use the `thiserror` crate to derive `std::error::Error` implementations.
//! This provides:
//! - Automatic `Display` implementation from the `#[error(...)]` attributes
//! - Automatic `From` implementations from the `#[from]` attributes
//! - Proper error source chaining via `#[source]`
//!
//! ## Error Categories
//!
//! | Category | Examples | Typical Response |
//! |----------|----------|------------------|
//! | Recovery | Torn index file at startup | Topic stays unavailable, repair files |
//! | Range | Read past the current length | Switch to live tailing |
//! | I/O | Open/read/write failure | Fail the single operation, retry later |
//! | Corruption | Short read, mismatched index record | Investigate the files |
//! | Lag | Live subscriber fell behind | Re-subscribe from last offset |

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

// =============================================================================
// Error Type
// =============================================================================

/// All errors that can occur in SpiteLog operations.
///
/// Every error is reported to the caller that issued the failing operation.
/// Nothing is logged-and-swallowed inside the engine.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // I/O Errors
    // =========================================================================

    /// A filesystem operation failed.
    ///
    /// `op` names the operation ("open", "read", "write", "stat", ...) so the
    /// message is useful without a backtrace.
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        /// The operation that failed.
        op: &'static str,
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Fewer bytes were read than requested.
    ///
    /// # When This Happens
    ///
    /// The file is shorter than the index claims it should be: truncation,
    /// an out-of-range local index, or external tampering. Never retried.
    #[error("short read from {}: expected {expected} bytes at offset {offset}, got {actual}", path.display())]
    ShortRead {
        /// The file being read.
        path: PathBuf,
        /// Byte offset of the read.
        offset: u64,
        /// Bytes requested.
        expected: usize,
        /// Bytes actually read.
        actual: usize,
    },

    /// Fewer bytes were written than requested.
    #[error("short write to {}: expected {expected} bytes, wrote {written}", path.display())]
    ShortWrite {
        /// The file being appended to.
        path: PathBuf,
        /// Bytes submitted.
        expected: usize,
        /// Bytes the OS accepted.
        written: usize,
    },

    /// A blocking I/O task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    // =========================================================================
    // Range Errors (Caller should switch strategy)
    // =========================================================================

    /// A historical read asked for records that do not exist yet.
    ///
    /// # Recovery
    ///
    /// Clamp the count to `length - offset`, or, when `offset >= length`,
    /// switch to live tailing via the event bus.
    #[error("read of {count} records at offset {offset} is out of range (length {length})")]
    OutOfRange {
        /// First requested offset.
        offset: u64,
        /// Number of records requested.
        count: u64,
        /// Topic length at the time of the call.
        length: u64,
    },

    // =========================================================================
    // Integrity Errors (Investigate and fix)
    // =========================================================================

    /// Startup recovery refused to open a topic.
    ///
    /// The topic never becomes available; no partial state is exposed.
    #[error("recovery of topic '{topic}' failed: {reason}")]
    Recovery {
        /// The topic being opened.
        topic: String,
        /// What was wrong with the on-disk layout.
        reason: String,
    },

    /// An index record contradicts its position in the file.
    #[error("corrupted file {}: {reason}", path.display())]
    Corruption {
        /// The corrupted file.
        path: PathBuf,
        /// What was inconsistent.
        reason: String,
    },

    // =========================================================================
    // Subscription Errors
    // =========================================================================

    /// A live subscriber fell behind and missed this many records.
    #[error("subscription lagged behind by {0} records")]
    SubscriptionLagged(u64),

    // =========================================================================
    // Usage Errors
    // =========================================================================

    /// The topic name is empty or reserved after sanitizing.
    #[error("invalid topic name: {0:?}")]
    InvalidTopicName(String),

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker task or its response channel has gone away.
    #[error("shut down: {0}")]
    Shutdown(String),
}

impl Error {
    /// Wraps an `io::Error` with the operation and path that produced it.
    pub fn io(op: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns true for errors that indicate damaged on-disk data.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::ShortRead { .. }
                | Error::ShortWrite { .. }
                | Error::Corruption { .. }
                | Error::Recovery { .. }
        )
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A `Result` type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Tests
// =============================================================================
