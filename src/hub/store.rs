//! Broadcast hub implementation
//!
//! The hub tracks which generation is live and holds the sending half of
//! every subscriber buffer registered against it. The pump thread copies each
//! chunk into a snapshot of that set; registration changes only hold the lock
//! long enough to edit the map. Removing a sender from the map is what ends a
//! subscriber's stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{RelayError, Result};
use crate::stats::HubStats;

use super::buffer::{subscriber_buffer, BufferSender, PushOutcome, SubscriberBuffer};
use super::config::HubConfig;

struct HubInner {
    /// Live generation, `None` between generations
    generation: Option<u64>,
    /// Highest generation ever opened
    last_opened: u64,
    subscribers: HashMap<u64, Arc<BufferSender>>,
}

#[derive(Default)]
struct HubCounters {
    chunks_pumped: AtomicU64,
    bytes_pumped: AtomicU64,
    dropped_chunks: AtomicU64,
    total_subscribers: AtomicU64,
}

/// Fan-out from the single source to every live subscriber
pub struct BroadcastHub {
    inner: Mutex<HubInner>,
    config: HubConfig,
    next_subscriber_id: AtomicU64,
    counters: HubCounters,
}

impl BroadcastHub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with custom configuration
    pub fn with_config(config: HubConfig) -> Self {
        Self {
            inner: Mutex::new(HubInner {
                generation: None,
                last_opened: 0,
                subscribers: HashMap::new(),
            }),
            config,
            next_subscriber_id: AtomicU64::new(1),
            counters: HubCounters::default(),
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new subscriber against the live generation
    ///
    /// Fails with `StreamUnavailable` when no generation is live; nothing is
    /// registered in that case.
    pub fn subscribe(&self) -> Result<SubscriberBuffer> {
        let mut inner = self.inner.lock();
        let generation = inner.generation.ok_or(RelayError::StreamUnavailable)?;

        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (sender, buffer) = subscriber_buffer(id, generation, self.config.buffer_capacity);
        inner.subscribers.insert(id, Arc::new(sender));
        self.counters.total_subscribers.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            generation = generation,
            subscriber_id = id,
            subscribers = inner.subscribers.len(),
            "Subscriber added"
        );

        Ok(buffer)
    }

    /// Remove a subscriber
    ///
    /// Unknown or already-removed ids are ignored.
    pub fn unsubscribe(&self, subscriber_id: u64) {
        let removed = {
            let mut inner = self.inner.lock();
            let sender = inner.subscribers.remove(&subscriber_id);
            sender.map(|sender| (sender, inner.subscribers.len()))
        };

        if let Some((sender, remaining)) = removed {
            tracing::debug!(
                generation = sender.generation(),
                subscriber_id = subscriber_id,
                subscribers = remaining,
                "Subscriber removed"
            );
        }
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Live generation, if any
    pub fn active_generation(&self) -> Option<u64> {
        self.inner.lock().generation
    }

    /// Snapshot of the hub counters
    pub fn stats(&self) -> HubStats {
        let (generation, active_subscribers) = {
            let inner = self.inner.lock();
            (inner.generation, inner.subscribers.len())
        };

        HubStats {
            generation,
            active_subscribers,
            total_subscribers: self.counters.total_subscribers.load(Ordering::Relaxed),
            chunks_pumped: self.counters.chunks_pumped.load(Ordering::Relaxed),
            bytes_pumped: self.counters.bytes_pumped.load(Ordering::Relaxed),
            dropped_chunks: self.counters.dropped_chunks.load(Ordering::Relaxed),
        }
    }

    /// Make `generation` the live one
    ///
    /// Subscribers of a previous generation that was never closed receive
    /// their end-of-stream marker first. Generations only move forward: an
    /// id at or below one already opened is ignored and `false` is returned.
    pub(crate) fn open_generation(&self, generation: u64) -> bool {
        let stale = {
            let mut inner = self.inner.lock();
            if generation <= inner.last_opened {
                return false;
            }
            inner.last_opened = generation;
            let previous = inner.generation.replace(generation);
            let stale: Vec<_> = inner.subscribers.drain().map(|(_, b)| b).collect();
            if let Some(previous) = previous {
                tracing::warn!(
                    previous = previous,
                    generation = generation,
                    stale_subscribers = stale.len(),
                    "Replacing a generation that was never closed"
                );
            }
            stale
        };

        drop(stale);

        tracing::info!(generation = generation, "Generation opened");
        true
    }

    /// End `generation`: deliver end-of-stream to every subscriber and clear
    /// the set
    ///
    /// Returns the number of subscribers notified. A generation that is not
    /// the live one is left alone and 0 is returned.
    pub(crate) fn close_generation(&self, generation: u64) -> usize {
        let subscribers: Vec<_> = {
            let mut inner = self.inner.lock();
            if inner.generation != Some(generation) {
                return 0;
            }
            inner.generation = None;
            inner.subscribers.drain().map(|(_, b)| b).collect()
        };
        let count = subscribers.len();
        drop(subscribers);

        tracing::info!(
            generation = generation,
            subscribers = count,
            "Generation closed"
        );

        count
    }

    /// Copy a chunk into every subscriber buffer of `generation`
    ///
    /// Never blocks: a full buffer drops the chunk for that subscriber only.
    /// Returns the number of buffers that queued the chunk, or `None` if
    /// `generation` is no longer live.
    pub(crate) fn broadcast(&self, generation: u64, chunk: &Bytes) -> Option<usize> {
        let targets: Vec<Arc<BufferSender>> = {
            let inner = self.inner.lock();
            if inner.generation != Some(generation) {
                return None;
            }
            inner.subscribers.values().cloned().collect()
        };

        self.counters.chunks_pumped.fetch_add(1, Ordering::Relaxed);
        self.counters
            .bytes_pumped
            .fetch_add(chunk.len() as u64, Ordering::Relaxed);

        let mut queued = 0;
        for sender in targets {
            match sender.try_push(chunk.clone()) {
                PushOutcome::Queued => queued += 1,
                PushOutcome::Dropped => {
                    self.counters.dropped_chunks.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(
                        generation = generation,
                        subscriber_id = sender.id(),
                        dropped = sender.dropped(),
                        "Subscriber buffer full, chunk dropped"
                    );
                }
                PushOutcome::Closed => {}
            }
        }

        Some(queued)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
