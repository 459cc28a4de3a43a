//! Bounded per-subscriber chunk channel
//!
//! Each subscriber is a bounded `tokio::sync::mpsc` channel. The hub keeps
//! the sending half and the pump thread pushes into it with `try_send`, so a
//! full channel drops the incoming chunk for this subscriber only. Dropping
//! the sending half is the end-of-stream marker: the receiver still gets
//! every chunk already queued, then `None`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Result of a non-blocking push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Chunk was queued
    Queued,
    /// Buffer was full; the chunk was discarded
    Dropped,
    /// The subscriber is gone
    Closed,
}

/// Create the two halves of a subscriber buffer
pub(crate) fn subscriber_buffer(
    id: u64,
    generation: u64,
    capacity: usize,
) -> (BufferSender, SubscriberBuffer) {
    let capacity = capacity.max(1);
    let (sender, receiver) = mpsc::channel(capacity);
    let dropped = Arc::new(AtomicU64::new(0));

    let tx = BufferSender {
        id,
        generation,
        sender,
        dropped: Arc::clone(&dropped),
    };
    let rx = SubscriberBuffer {
        id,
        generation,
        capacity,
        receiver,
        delivered: 0,
        dropped,
    };
    (tx, rx)
}

/// Hub-side half, written by the pump thread
#[derive(Debug)]
pub(crate) struct BufferSender {
    id: u64,
    generation: u64,
    sender: mpsc::Sender<Bytes>,
    dropped: Arc<AtomicU64>,
}

impl BufferSender {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queue a chunk without blocking
    pub(crate) fn try_push(&self, chunk: Bytes) -> PushOutcome {
        match self.sender.try_send(chunk) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                PushOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => PushOutcome::Closed,
        }
    }
}

/// Listener-side half of a subscriber buffer
#[derive(Debug)]
pub struct SubscriberBuffer {
    id: u64,
    generation: u64,
    capacity: usize,
    receiver: mpsc::Receiver<Bytes>,
    delivered: u64,
    dropped: Arc<AtomicU64>,
}

impl SubscriberBuffer {
    /// Subscriber id, unique for the lifetime of the hub
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Generation this buffer was created under
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Maximum number of queued chunks
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of chunks currently queued
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no chunks are queued
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Whether the hub has released this subscriber
    ///
    /// Queued chunks may still be waiting to be received.
    pub fn is_finished(&self) -> bool {
        self.receiver.is_closed()
    }

    /// Chunks handed to the consumer so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Chunks discarded because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Wait for the next chunk
    ///
    /// Returns `None` once every queued chunk has been taken and the hub has
    /// released this subscriber.
    pub async fn recv(&mut self) -> Option<Bytes> {
        let chunk = self.receiver.recv().await?;
        self.delivered += 1;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn chunk(n: u8) -> Bytes {
        Bytes::from(vec![n; 4])
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = subscriber_buffer(1, 1, 8);
        for n in 1..=3 {
            assert_eq!(tx.try_push(chunk(n)), PushOutcome::Queued);
        }

        assert_eq!(rx.recv().await, Some(chunk(1)));
        assert_eq!(rx.recv().await, Some(chunk(2)));
        assert_eq!(rx.recv().await, Some(chunk(3)));
        assert_eq!(rx.delivered(), 3);
    }

    #[test]
    fn test_drop_on_full() {
        let (tx, rx) = subscriber_buffer(1, 1, 2);
        assert_eq!(tx.try_push(chunk(1)), PushOutcome::Queued);
        assert_eq!(tx.try_push(chunk(2)), PushOutcome::Queued);
        assert_eq!(tx.try_push(chunk(3)), PushOutcome::Dropped);
        assert_eq!(tx.try_push(chunk(4)), PushOutcome::Dropped);

        // Never grows past capacity
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.dropped(), 2);
        assert_eq!(tx.dropped(), 2);
    }

    #[tokio::test]
    async fn test_end_on_full_buffer_keeps_data() {
        let (tx, mut rx) = subscriber_buffer(1, 1, 2);
        tx.try_push(chunk(1));
        tx.try_push(chunk(2));
        drop(tx);

        assert!(rx.is_finished());
        assert_eq!(rx.recv().await, Some(chunk(1)));
        assert_eq!(rx.recv().await, Some(chunk(2)));
        assert_eq!(rx.recv().await, None);
        // End is sticky
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_push_after_receiver_dropped() {
        let (tx, rx) = subscriber_buffer(1, 1, 2);
        drop(rx);

        assert_eq!(tx.try_push(chunk(1)), PushOutcome::Closed);
        assert_eq!(tx.dropped(), 0);
    }

    #[test]
    fn test_recv_waits_for_push() {
        let (tx, mut rx) = subscriber_buffer(1, 1, 4);
        let mut recv = task::spawn(rx.recv());

        assert_pending!(recv.poll());
        tx.try_push(chunk(9));
        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), Some(chunk(9)));
    }

    #[test]
    fn test_recv_wakes_on_end() {
        let (tx, mut rx) = subscriber_buffer(1, 1, 4);
        let mut recv = task::spawn(rx.recv());

        assert_pending!(recv.poll());
        drop(tx);
        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), None);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let (tx, rx) = subscriber_buffer(7, 3, 0);
        assert_eq!(rx.capacity(), 1);
        assert_eq!(rx.id(), 7);
        assert_eq!(tx.id(), 7);
        assert_eq!(rx.generation(), 3);
        assert_eq!(tx.generation(), 3);
    }
}
