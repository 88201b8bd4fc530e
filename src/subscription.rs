//! # Subscriptions & Live Tailing
//!
//! This module turns the event bus into the reading side of a topic. Three
//! shapes are offered:
//!
//! - [`LiveSubscription`]: raw bus listener, records written after it attached
//! - [`CatchUpSubscription`]: replay from any offset, then follow live writes
//! - [`poll`]: one long-poll round trip, the primitive a request layer uses
//!
//! ## The Catch-Up + Live Pattern
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Subscription Timeline                             │
//! │                                                                          │
//! │  1. attach live listener   2. read length = 500                          │
//! │       │                         │                                        │
//! │       ▼                         ▼                                        │
//! │  ┌────────────────────────────────┐  ┌──────────────────────────────┐   │
//! │  │     Phase 1: Catch-Up          │  │     Phase 2: Live            │   │
//! │  │     Topic::read(100..500)      │  │     bus records 500+         │   │
//! │  │     from chunk files           │  │     (offsets < cursor        │   │
//! │  │                                │  │      skipped)                │   │
//! │  └────────────────────────────────┘  └──────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The listener must attach *before* the length is read. A record written in
//! between is then both in the catch-up range and in the listener's buffer;
//! the duplicate is dropped by offset. Attaching afterwards would lose it.
//!
//! ## Backpressure Handling
//!
//! Bus channels are bounded. A listener that falls more than the channel
//! capacity behind gets `RecvError::Lagged(n)`:
//! - [`LiveSubscription`] reports it as `Error::SubscriptionLagged(n)`
//! - [`CatchUpSubscription`] goes back to catch-up from its cursor
//! - [`poll`] returns what it already has, or reads the backlog from disk

use std::time::Duration;

use futures::TryStreamExt;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::topic::Topic;
use crate::types::{PollResult, Record};

// =============================================================================
// Configuration
// =============================================================================

/// Default batch size for catch-up reads.
///
/// Larger batches are more efficient but use more memory.
pub const DEFAULT_CATCHUP_BATCH_SIZE: usize = 1000;

// =============================================================================
// Live Subscription
// =============================================================================

/// A listener on one topic's bus channel.
///
/// Receives every record published after it was created. Dropping it
/// detaches it from the channel.
///
/// # Example
///
/// ```rust,ignore
/// let mut live = bus.subscribe("orders");
///
/// loop {
///     match live.next().await {
///         Some(Ok(record)) => println!("{}: {:?}", record.offset, record.value),
///         Some(Err(e)) => {
///             eprintln!("Error: {}", e);
///             break;
///         }
///         None => break, // Bus dropped
///     }
/// }
/// ```
pub struct LiveSubscription {
    receiver: broadcast::Receiver<Record>,
}

impl LiveSubscription {
    /// Wraps a broadcast receiver.
    pub fn new(receiver: broadcast::Receiver<Record>) -> Self {
        Self { receiver }
    }

    /// Waits for the next record.
    ///
    /// # Returns
    ///
    /// - `Some(Ok(record))` - Next record
    /// - `Some(Err(e))` - The listener lagged and records were skipped
    /// - `None` - The channel is gone
    pub async fn next(&mut self) -> Option<Result<Record>> {
        match self.receiver.recv().await {
            Ok(record) => Some(Ok(record)),
            Err(broadcast::error::RecvError::Lagged(n)) => Some(Err(Error::SubscriptionLagged(n))),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Returns an already buffered record without waiting.
    ///
    /// `None` means nothing is buffered (or the channel is gone).
    pub fn try_next(&mut self) -> Option<Result<Record>> {
        match self.receiver.try_recv() {
            Ok(record) => Some(Ok(record)),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Some(Err(Error::SubscriptionLagged(n)))
            }
            Err(broadcast::error::TryRecvError::Empty)
            | Err(broadcast::error::TryRecvError::Closed) => None,
        }
    }

    /// Records published but not yet received by this listener.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Catch-Up Subscription
// =============================================================================

/// Phase of the catch-up subscription.
enum CatchUpPhase {
    /// Reading records below `live_start` from disk.
    CatchingUp,
    /// Receiving records from the bus.
    Live,
    /// A read failed or the bus went away.
    Ended,
}

/// Every record of a topic from a starting offset onwards, with no gaps and
/// no duplicates.
///
/// # Example
///
/// ```rust,ignore
/// let mut sub = CatchUpSubscription::start(topic, 1000, DEFAULT_CATCHUP_BATCH_SIZE);
///
/// // Records 1000, 1001, ... whether already written or not
/// while let Some(result) = sub.next().await {
///     let record = result?;
///     println!("{}: {:?}", record.offset, record.value);
/// }
/// ```
pub struct CatchUpSubscription {
    topic: Topic,
    phase: CatchUpPhase,

    /// Next offset to deliver.
    current: u64,

    /// Topic length observed after the listener attached.
    live_start: u64,

    live: LiveSubscription,
    batch_size: usize,

    /// Records from the last catch-up read, in reverse order.
    buffer: Vec<Record>,
}

impl CatchUpSubscription {
    /// Starts following `topic` from offset `from`.
    ///
    /// Attaches the bus listener first, then reads the length, so no record
    /// can fall between the two phases.
    pub fn start(topic: Topic, from: u64, batch_size: usize) -> Self {
        let live = topic.subscribe();
        let live_start = topic.length();

        let phase = if from >= live_start {
            CatchUpPhase::Live
        } else {
            CatchUpPhase::CatchingUp
        };

        Self {
            topic,
            phase,
            current: from,
            live_start,
            live,
            batch_size: batch_size.max(1),
            buffer: Vec::new(),
        }
    }

    /// Gets the next record.
    pub async fn next(&mut self) -> Option<Result<Record>> {
        loop {
            match self.phase {
                CatchUpPhase::CatchingUp => {
                    if let Some(record) = self.buffer.pop() {
                        self.current = record.offset + 1;
                        return Some(Ok(record));
                    }

                    if self.current >= self.live_start {
                        debug!(topic = %self.topic.name(), offset = self.current, "caught up, switching to live");
                        self.phase = CatchUpPhase::Live;
                        continue;
                    }

                    let count = (self.live_start - self.current).min(self.batch_size as u64);
                    match self.read_batch(count).await {
                        Ok(mut records) => {
                            records.reverse();
                            self.buffer = records;
                        }
                        Err(e) => {
                            self.phase = CatchUpPhase::Ended;
                            return Some(Err(e));
                        }
                    }
                }

                CatchUpPhase::Live => match self.live.next().await {
                    Some(Ok(record)) => {
                        // already delivered during catch-up, or before `from`
                        if record.offset < self.current {
                            continue;
                        }
                        self.current = record.offset + 1;
                        return Some(Ok(record));
                    }
                    Some(Err(Error::SubscriptionLagged(missed))) => {
                        debug!(
                            topic = %self.topic.name(),
                            missed,
                            offset = self.current,
                            "live listener lagged, catching up from disk"
                        );
                        self.live_start = self.topic.length();
                        self.phase = CatchUpPhase::CatchingUp;
                    }
                    Some(Err(e)) => {
                        self.phase = CatchUpPhase::Ended;
                        return Some(Err(e));
                    }
                    None => {
                        self.phase = CatchUpPhase::Ended;
                        return None;
                    }
                },

                CatchUpPhase::Ended => return None,
            }
        }
    }

    /// Returns whether the subscription is in the live phase.
    pub fn is_live(&self) -> bool {
        matches!(self.phase, CatchUpPhase::Live)
    }

    /// Offset of the next record this subscription will deliver.
    pub fn current_offset(&self) -> u64 {
        self.current
    }

    async fn read_batch(&self, count: u64) -> Result<Vec<Record>> {
        self.topic
            .read(self.current, count)?
            .into_stream()
            .try_collect()
            .await
    }
}

// =============================================================================
// Long Poll
// =============================================================================

/// Returns up to `max` records starting at `offset`, waiting up to `wait`
/// when there are none yet.
///
/// - `offset < length`: returns `min(max, length - offset)` records from disk
///   right away
/// - otherwise: waits for the first record at or after `offset`, then adds
///   whatever further records are already buffered, up to `max`
///
/// An empty result means the wait timed out. `next_offset` in the result is
/// where the following poll should start. Dropping the future detaches the
/// listener.
pub async fn poll(topic: &Topic, offset: u64, max: usize, wait: Duration) -> Result<PollResult> {
    if max == 0 {
        return Ok(PollResult::new(offset, Vec::new()));
    }

    // attach before looking at the length
    let mut live = topic.subscribe();
    let deadline = Instant::now() + wait;

    if offset >= topic.length() {
        let mut records: Vec<Record> = Vec::new();

        loop {
            match tokio::time::timeout_at(deadline, live.next()).await {
                Err(_) | Ok(None) => return Ok(PollResult::new(offset, records)),
                Ok(Some(Ok(record))) => {
                    if record.offset >= offset {
                        records.push(record);
                        break;
                    }
                }
                // the backlog is on disk now
                Ok(Some(Err(Error::SubscriptionLagged(_)))) => break,
                Ok(Some(Err(e))) => return Err(e),
            }
        }

        if let Some(first) = records.first() {
            let mut next = first.offset + 1;
            while records.len() < max {
                match live.try_next() {
                    Some(Ok(record)) if record.offset == next => {
                        next += 1;
                        records.push(record);
                    }
                    Some(Ok(_)) => continue,
                    // lagged or drained; the rest is picked up by the next poll
                    Some(Err(_)) | None => break,
                }
            }
            return Ok(PollResult::new(offset, records));
        }
    }

    let length = topic.length();
    if offset >= length {
        return Ok(PollResult::new(offset, Vec::new()));
    }
    let count = (length - offset).min(max as u64);
    let records = topic.read(offset, count)?.into_stream().try_collect().await?;
    Ok(PollResult::new(offset, records))
}

// =============================================================================
// Tests
// =============================================================================
