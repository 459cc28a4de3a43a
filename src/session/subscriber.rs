//! Per-listener session
//!
//! A [`SubscriberSession`] wraps exactly one subscriber buffer and forwards
//! its chunks, in order, to one network connection. However the session ends
//! (end-of-stream, write failure, or the transport dropping it after a client
//! disconnect) it deregisters itself from the hub when dropped.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{RelayError, Result};
use crate::hub::{BroadcastHub, SubscriberBuffer};
use crate::stats::SessionStats;

/// One listener's handle on the broadcast
pub struct SubscriberSession {
    hub: Arc<BroadcastHub>,
    buffer: SubscriberBuffer,
    opened_at: Instant,
    bytes_sent: u64,
}

impl SubscriberSession {
    /// Register a new subscriber with the hub
    ///
    /// Fails with `StreamUnavailable` when no generation is live.
    pub fn open(hub: &Arc<BroadcastHub>) -> Result<Self> {
        let buffer = hub.subscribe()?;
        Ok(Self {
            hub: Arc::clone(hub),
            buffer,
            opened_at: Instant::now(),
            bytes_sent: 0,
        })
    }

    /// Subscriber id
    pub fn id(&self) -> u64 {
        self.buffer.id()
    }

    /// Generation this session belongs to
    pub fn generation(&self) -> u64 {
        self.buffer.generation()
    }

    /// Wait for the next chunk; `None` once the generation has ended
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        let chunk = self.buffer.recv().await?;
        self.bytes_sent += chunk.len() as u64;
        Some(chunk)
    }

    /// Current statistics
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            subscriber_id: self.buffer.id(),
            generation: self.buffer.generation(),
            chunks_delivered: self.buffer.delivered(),
            chunks_dropped: self.buffer.dropped(),
            bytes_sent: self.bytes_sent,
            duration: self.opened_at.elapsed(),
        }
    }

    /// Drain loop: write every chunk to `writer` until end-of-stream
    ///
    /// A write failure ends the session with `TransportWrite`. Either way the
    /// session is consumed and deregisters itself.
    pub async fn drain_to<W>(mut self, writer: &mut W) -> Result<SessionStats>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(chunk) = self.next_chunk().await {
            writer
                .write_all(&chunk)
                .await
                .map_err(RelayError::TransportWrite)?;
        }
        writer.flush().await.map_err(RelayError::TransportWrite)?;

        Ok(self.stats())
    }

    /// Turn the session into a byte stream for a streaming response body
    ///
    /// The stream ends at end-of-stream. Dropping it early (client
    /// disconnect) drops the session and deregisters it.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        stream::unfold(self, |mut session| async move {
            let chunk = session.next_chunk().await?;
            Some((Ok(chunk), session))
        })
    }
}

impl Drop for SubscriberSession {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.buffer.id());

        let stats = self.stats();
        tracing::debug!(
            subscriber_id = stats.subscriber_id,
            generation = stats.generation,
            delivered = stats.chunks_delivered,
            dropped = stats.chunks_dropped,
            bytes = stats.bytes_sent,
            duration = ?stats.duration,
            "Subscriber session ended"
        );
    }
}

impl std::fmt::Debug for SubscriberSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberSession")
            .field("id", &self.buffer.id())
            .field("generation", &self.buffer.generation())
            .field("bytes_sent", &self.bytes_sent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::io::AsyncReadExt;

    use crate::hub::HubConfig;

    fn live_hub(capacity: usize) -> Arc<BroadcastHub> {
        let hub = Arc::new(BroadcastHub::with_config(
            HubConfig::default().buffer_capacity(capacity),
        ));
        hub.open_generation(1);
        hub
    }

    #[test]
    fn test_open_without_stream() {
        let hub = Arc::new(BroadcastHub::new());

        let result = SubscriberSession::open(&hub);
        assert!(matches!(result, Err(RelayError::StreamUnavailable)));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_deregisters() {
        let hub = live_hub(4);
        let session = SubscriberSession::open(&hub).unwrap();
        assert_eq!(hub.subscriber_count(), 1);

        drop(session);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_drain_until_end_of_stream() {
        let hub = live_hub(8);
        let session = SubscriberSession::open(&hub).unwrap();

        hub.broadcast(1, &Bytes::from_static(b"abc")).unwrap();
        hub.broadcast(1, &Bytes::from_static(b"def")).unwrap();
        hub.close_generation(1);

        let mut out = Vec::new();
        let stats = session.drain_to(&mut out).await.unwrap();

        assert_eq!(out, b"abcdef");
        assert_eq!(stats.chunks_delivered, 2);
        assert_eq!(stats.bytes_sent, 6);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_deregisters() {
        let hub = live_hub(8);
        let session = SubscriberSession::open(&hub).unwrap();
        let other = SubscriberSession::open(&hub).unwrap();

        let (mut client, mut server) = tokio::io::duplex(64);
        let drain = tokio::spawn(async move { session.drain_to(&mut server).await });

        hub.broadcast(1, &Bytes::from_static(b"hello")).unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");

        // Client disconnects
        drop(client);
        hub.broadcast(1, &Bytes::from_static(b"world")).unwrap();

        let result = drain.await.unwrap();
        assert!(matches!(result, Err(RelayError::TransportWrite(_))));

        // Only the failed session is gone
        assert_eq!(hub.subscriber_count(), 1);
        drop(other);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_yields_chunks_in_order() {
        let hub = live_hub(8);
        let session = SubscriberSession::open(&hub).unwrap();

        for chunk in ["one", "two", "three"] {
            hub.broadcast(1, &Bytes::from(chunk)).unwrap();
        }
        hub.close_generation(1);

        let chunks: Vec<Bytes> = session
            .into_stream()
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                Bytes::from_static(b"one"),
                Bytes::from_static(b"two"),
                Bytes::from_static(b"three"),
            ]
        );
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dropping_stream_deregisters() {
        let hub = live_hub(8);
        let session = SubscriberSession::open(&hub).unwrap();
        let stream = session.into_stream();
        assert_eq!(hub.subscriber_count(), 1);

        drop(stream);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
