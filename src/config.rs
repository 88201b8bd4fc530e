//! # Store Configuration
//!
//! Controls where topics live on disk and how the engine sizes its chunks,
//! queues, and buffers:
//!
//! - **data_dir**: Root directory; every topic is one subdirectory (default: `./data`)
//! - **records_per_file**: Chunk capacity in records (default: 10000)
//! - **idle_timeout_ms**: Close a file handle after this much inactivity (default: 1s)
//! - **broadcast_capacity**: Live records buffered per topic before subscribers lag (default: 10000)
//! - **write_queue_capacity**: Depth of the per-topic write queue and per-file append queue (default: 4096)
//!
//! `StoreConfig` derives serde traits so the process can load it from any
//! format it likes; missing fields fall back to their defaults.
//!
//! ## Usage
//!
//! ```ignore
//! use spitelog::StoreConfig;
//!
//! let config = StoreConfig {
//!     data_dir: "/var/lib/spitelog".into(),
//!     ..Default::default()
//! };
//!
//! // Small chunks for tests
//! let config = StoreConfig::default()
//!     .with_data_dir(temp_dir.path())
//!     .with_records_per_file(3);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// Defaults
// =============================================================================

/// Default chunk capacity.
pub const DEFAULT_RECORDS_PER_FILE: u64 = 10_000;

/// Default idle timeout before a file handle is closed.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 1_000;

/// Default number of live records buffered per topic.
///
/// Matches the subscription buffer size used for broadcast fan-out: slow
/// subscribers get `Error::SubscriptionLagged` once they fall this far behind.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 10_000;

/// Default depth of the write and append queues.
pub const DEFAULT_WRITE_QUEUE_CAPACITY: usize = 4096;

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_records_per_file() -> u64 {
    DEFAULT_RECORDS_PER_FILE
}

fn default_idle_timeout_ms() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}

fn default_broadcast_capacity() -> usize {
    DEFAULT_BROADCAST_CAPACITY
}

fn default_write_queue_capacity() -> usize {
    DEFAULT_WRITE_QUEUE_CAPACITY
}

// =============================================================================
// StoreConfig
// =============================================================================

/// Configuration shared by every topic in one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory holding one subdirectory per topic.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Number of records per chunk (one log file + one index file).
    #[serde(default = "default_records_per_file")]
    pub records_per_file: u64,

    /// Inactivity in milliseconds before an open file handle is closed.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Live records buffered per topic channel.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// Pending writes (per topic) and appends (per file) before senders wait.
    #[serde(default = "default_write_queue_capacity")]
    pub write_queue_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            records_per_file: default_records_per_file(),
            idle_timeout_ms: default_idle_timeout_ms(),
            broadcast_capacity: default_broadcast_capacity(),
            write_queue_capacity: default_write_queue_capacity(),
        }
    }
}

impl StoreConfig {
    /// Sets the data directory.
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Sets the chunk capacity.
    pub fn with_records_per_file(mut self, records_per_file: u64) -> Self {
        self.records_per_file = records_per_file;
        self
    }

    /// Sets the idle timeout for file handles.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the per-topic broadcast buffer.
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Idle timeout as a `Duration`.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Rejects values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.records_per_file == 0 {
            return Err(Error::InvalidConfig(
                "records_per_file must be > 0".to_string(),
            ));
        }
        // local indexes are stored as u32
        if self.records_per_file > u64::from(u32::MAX) {
            return Err(Error::InvalidConfig(format!(
                "records_per_file must be <= {}",
                u32::MAX
            )));
        }
        if self.idle_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "idle_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(Error::InvalidConfig(
                "broadcast_capacity must be > 0".to_string(),
            ));
        }
        if self.write_queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "write_queue_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
