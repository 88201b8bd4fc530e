//! # Topic Registry
//!
//! Maps topic names to their single [`Topic`] instance. Two engines over the
//! same directory would assign the same offsets twice, so construction is
//! funnelled through a per-name `OnceCell`: the first caller opens the topic,
//! concurrent callers wait for that same construction, and later callers get
//! the finished handle.
//!
//! A construction that fails (for example a recovery error) leaves the cell
//! empty, so the next `get_topic` tries again.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::try_join_all;
use tokio::sync::OnceCell;
use tracing::info;

use crate::bus::EventBus;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::topic::Topic;
use crate::types::TopicName;

type TopicSlots = HashMap<TopicName, Arc<OnceCell<Topic>>>;

/// Lazily constructed topics, one per name.
pub struct TopicRegistry {
    config: StoreConfig,
    bus: EventBus,
    topics: Mutex<TopicSlots>,
}

impl TopicRegistry {
    /// Creates an empty registry whose topics publish to `bus`.
    pub fn new(config: StoreConfig, bus: EventBus) -> Self {
        Self {
            config,
            bus,
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the topic called `name`, opening it on first reference.
    ///
    /// The name is sanitized first, so `"a/b"` and `"a!b"` are the same
    /// topic.
    pub async fn get_topic(&self, name: impl AsRef<str>) -> Result<Topic> {
        let name = TopicName::new(name)?;

        let slot = {
            let mut topics = self.lock();
            Arc::clone(topics.entry(name.clone()).or_default())
        };

        let topic = slot
            .get_or_try_init(|| async {
                let topic = Topic::open(name.clone(), &self.config, self.bus.clone()).await?;
                info!(topic = %name, length = topic.length(), "registered topic");
                Ok::<_, Error>(topic)
            })
            .await?;

        Ok(topic.clone())
    }

    /// Names of all topic directories under the data directory, sorted.
    ///
    /// Includes topics that exist on disk but have not been opened yet.
    pub async fn list_topics(&self) -> Result<Vec<String>> {
        let dir = &self.config.data_dir;
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io("read_dir", dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io("read_dir", dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::io("stat", entry.path(), e))?;
            if !file_type.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Closes the files of every topic opened so far.
    pub async fn close_all(&self) -> Result<()> {
        let topics: Vec<Topic> = self
            .lock()
            .values()
            .filter_map(|slot| slot.get().cloned())
            .collect();

        try_join_all(topics.iter().map(|topic| topic.close())).await?;
        Ok(())
    }

    /// Number of topics constructed so far.
    pub fn topic_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Configuration shared by every topic.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, TopicSlots> {
        self.topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
