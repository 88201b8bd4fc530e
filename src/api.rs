//! # Async API for SpiteLog
//!
//! [`SpiteLog`] is the process-scoped context the request layer talks to. It
//! owns the two process-wide maps, the [`EventBus`] and the
//! [`TopicRegistry`], and hands out [`Topic`] handles from them. Nothing is
//! global: every `SpiteLog::open` builds fresh maps, so tests can run many
//! isolated stores side by side.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Request layer (tasks)                    │
//! └───────────────┬──────────────────────────────┬──────────────┘
//!                 │ write / read / poll          │ subscribe
//!                 ▼                              ▼
//!        ┌─────────────────┐            ┌─────────────────┐
//!        │  TopicRegistry  │            │    EventBus     │
//!        │  name → Topic   │            │ name → channel  │
//!        └────────┬────────┘            └────────▲────────┘
//!                 │                              │ publish
//!                 ▼                              │
//!        ┌──────────────────────────────────────┴─────────┐
//!        │  Topic: writer task, chunks (log + index files)│
//!        └────────────────────────────────────────────────┘
//! ```
//!
//! ## Rust Concepts
//!
//! - **Cheap clones**: `SpiteLog` is an `Arc` plus a bus handle; clone it into
//!   every task instead of passing references around.
//! - **async/await**: every operation that touches a file suspends its caller
//!   instead of blocking a thread.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::info;

use crate::bus::EventBus;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::registry::TopicRegistry;
use crate::subscription::{self, CatchUpSubscription, DEFAULT_CATCHUP_BATCH_SIZE};
use crate::topic::{Topic, TopicReader};
use crate::types::PollResult;

// =============================================================================
// SpiteLog - The Main Async Handle
// =============================================================================

/// The main async handle for SpiteLog operations.
///
/// # Thread Safety
///
/// `SpiteLog` is `Clone`, `Send`, and `Sync`. All clones share the same
/// topics and bus.
///
/// # Example
///
/// ```rust,ignore
/// use spitelog::{SpiteLog, StoreConfig};
///
/// let log = SpiteLog::open(StoreConfig::default().with_data_dir("./data")).await?;
///
/// let offset = log.write("orders", &b"order #1"[..]).await?;
///
/// let mut sub = log.subscribe("orders", 0).await?;
/// while let Some(record) = sub.next().await {
///     let record = record?;
///     println!("{} {:?}", record.offset, record.value);
/// }
/// ```
#[derive(Clone)]
pub struct SpiteLog {
    registry: Arc<TopicRegistry>,
    bus: EventBus,
}

impl SpiteLog {
    /// Opens a store rooted at `config.data_dir`.
    ///
    /// Validates the configuration and creates the data directory. Topics are
    /// opened lazily on first reference.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .map_err(|e| Error::io("create_dir", &config.data_dir, e))?;

        info!(
            data_dir = %config.data_dir.display(),
            records_per_file = config.records_per_file,
            "opened store"
        );

        let bus = EventBus::new(config.broadcast_capacity);
        let registry = Arc::new(TopicRegistry::new(config, bus.clone()));
        Ok(Self { registry, bus })
    }

    // =========================================================================
    // Topics
    // =========================================================================

    /// Returns the topic called `name`, opening it on first reference.
    pub async fn topic(&self, name: impl AsRef<str>) -> Result<Topic> {
        self.registry.get_topic(name).await
    }

    /// Names of every topic on disk, sorted.
    pub async fn list_topics(&self) -> Result<Vec<String>> {
        self.registry.list_topics().await
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Appends `payload` to topic `name` and returns its offset.
    pub async fn write(&self, name: impl AsRef<str>, payload: impl Into<Bytes>) -> Result<u64> {
        self.topic(name).await?.write(payload).await
    }

    /// Appends several payloads to topic `name` with contiguous offsets.
    pub async fn write_many(&self, name: impl AsRef<str>, payloads: Vec<Bytes>) -> Result<Vec<u64>> {
        self.topic(name).await?.write_many(payloads).await
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Reader over `count` existing records of `name` starting at `offset`.
    pub async fn read(&self, name: impl AsRef<str>, offset: u64, count: u64) -> Result<TopicReader> {
        self.topic(name).await?.read(offset, count)
    }

    /// Current length of topic `name`.
    pub async fn length(&self, name: impl AsRef<str>) -> Result<u64> {
        Ok(self.topic(name).await?.length())
    }

    /// Long-polls topic `name`; see [`subscription::poll`].
    pub async fn poll(
        &self,
        name: impl AsRef<str>,
        offset: u64,
        max: usize,
        wait: Duration,
    ) -> Result<PollResult> {
        let topic = self.topic(name).await?;
        subscription::poll(&topic, offset, max, wait).await
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Follows topic `name` from offset `from`, history first, then live.
    pub async fn subscribe(&self, name: impl AsRef<str>, from: u64) -> Result<CatchUpSubscription> {
        let topic = self.topic(name).await?;
        Ok(CatchUpSubscription::start(topic, from, DEFAULT_CATCHUP_BATCH_SIZE))
    }

    /// The bus shared by every topic of this store.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The registry backing [`topic`](Self::topic).
    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    /// Configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        self.registry.config()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Closes the files of every open topic.
    ///
    /// Handles stay valid; a later operation simply reopens files.
    pub async fn shutdown(&self) -> Result<()> {
        self.registry.close_all().await?;
        info!(topics = self.registry.topic_count(), "store shut down");
        Ok(())
    }
}

impl std::fmt::Debug for SpiteLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpiteLog")
            .field("data_dir", &self.config().data_dir)
            .field("topics", &self.registry.topic_count())
            .finish()
    }
}
