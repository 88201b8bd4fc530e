//! # SpiteLog - Topic Log Store
//!
//! SpiteLog is a single-node, append-only log store organized into named
//! topics. It provides:
//!
//! - **Durable ordered writes**: every record gets the next contiguous offset
//! - **Chunked storage**: fixed-capacity log + index file pairs per topic
//! - **Historical reads**: pull-based, cancelable range readers
//! - **Live tailing**: gap-free handoff from history to newly written records
//! - **Crash recovery**: topic length rebuilt and validated from index files
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Async API Layer                          │
//! │            (SpiteLog: write, read, poll, subscribe)             │
//! └───────────────┬─────────────────────────────────┬───────────────┘
//!                 │                                 │
//!                 ▼                                 ▼
//! ┌───────────────────────────────┐   ┌─────────────────────────────┐
//! │        Topic Registry         │   │          Event Bus          │
//! │   (one engine per topic)      │   │  (one channel per topic)    │
//! └───────────────┬───────────────┘   └──────────────▲──────────────┘
//!                 │                                  │ publish
//!                 ▼                                  │
//! ┌─────────────────────────────────────────────────┴───────────────┐
//! │                    Topic Storage Engine                         │
//! │          (single writer task, chunk cache, recovery)            │
//! │                                                                 │
//! │   ┌──────────────────────┐        ┌──────────────────────┐      │
//! │   │   Log File Manager   │        │  Index File Manager  │      │
//! │   └──────────┬───────────┘        └──────────┬───────────┘      │
//! │              └─────────── FileHandle ────────┘                  │
//! │          (lazy open, idle close, FIFO appends, pread)           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Invariants
//!
//! These invariants are enforced throughout the codebase and must never be violated:
//!
//! 1. **Contiguous offsets**: offsets start at 0 and are never skipped or reused
//! 2. **Single writer per topic**: offset order equals write-queue order
//! 3. **Full chunks**: only the highest-numbered chunk may be partially filled
//! 4. **Publish after write**: a record reaches the bus only once it is in both
//!    files and counted in the topic's length
//! 5. **No missed records**: live readers attach before reading the length
//!
//! ## Module Organization
//!
//! - [`error`]: Custom error types for all failure modes
//! - [`config`]: Store configuration
//! - [`types`]: Domain types (TopicName, Record, IndexRecord, etc.)
//! - [`codec`]: On-disk record layouts
//! - [`file_handle`]: Per-file handle management
//! - [`log_file`] / [`index_file`]: The two files of a chunk
//! - [`topic`]: Topic storage engine
//! - [`bus`]: Event bus
//! - [`subscription`]: Live, catch-up, and long-poll readers
//! - [`registry`]: Topic registry
//! - [`api`]: Async API (main entry point)

// =============================================================================
// Module Declarations
// =============================================================================

/// Error types for SpiteLog operations.
///
/// This module defines all error variants that can occur during storage
/// operations. Using a single error enum simplifies error handling for callers.
pub mod error;

/// Store configuration.
pub mod config;

/// Domain types: topic names, records, and index entries.
pub mod types;

/// Record codecs for index and log files.
///
/// Index records are fixed-width little-endian; log records are raw payloads
/// followed by a newline.
pub mod codec;

/// File handle management.
///
/// One [`FileHandle`](file_handle::FileHandle) per file: opened lazily, closed
/// when idle, appends serialized through a FIFO worker, reads positional and
/// concurrent. [`RecordFile`](file_handle::RecordFile) layers a codec on top.
pub mod file_handle;

/// Payload storage for one chunk.
pub mod log_file;

/// Index storage for one chunk.
pub mod index_file;

/// Topic storage engine.
///
/// Chunked storage, the serialized write path, range readers, and startup
/// recovery. The main type is [`Topic`](topic::Topic).
pub mod topic;

/// Process-wide event bus with one broadcast channel per topic.
pub mod bus;

/// Subscriptions and live tailing.
///
/// Key features:
/// - Live records via the bus
/// - Catch-up from any offset then seamless switch to live
/// - Long-poll for request/response consumers
/// - Backpressure handling for slow subscribers
///
/// See [`subscription::LiveSubscription`] for basic live subscriptions and
/// [`subscription::CatchUpSubscription`] for the catch-up + live pattern.
pub mod subscription;

/// Topic registry: one engine instance per topic name.
pub mod registry;

/// Async API for SpiteLog.
///
/// The main entry point is [`SpiteLog`](api::SpiteLog).
pub mod api;

// =============================================================================
// Re-exports
// =============================================================================
// Users can write `use spitelog::Error` instead of `use spitelog::error::Error`.

pub use api::SpiteLog;
pub use bus::EventBus;
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use registry::TopicRegistry;
pub use topic::{Topic, TopicReader};

// Re-export commonly used types from the types module
pub use types::{IndexRecord, LogRange, PollResult, Record, TopicName};

// Re-export subscription types
pub use subscription::{poll, CatchUpSubscription, LiveSubscription, DEFAULT_CATCHUP_BATCH_SIZE};
