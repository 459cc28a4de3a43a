//! Statistics for the relay and its listener sessions

use std::time::Duration;

use serde::Serialize;

use crate::source::SourceState;

/// Per-listener statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Subscriber id
    pub subscriber_id: u64,
    /// Generation the session was attached to
    pub generation: u64,
    /// Chunks taken from the buffer
    pub chunks_delivered: u64,
    /// Chunks dropped because the buffer was full
    pub chunks_dropped: u64,
    /// Bytes forwarded to the listener
    pub bytes_sent: u64,
    /// Session duration
    pub duration: Duration,
}

impl SessionStats {
    /// Average send rate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration.as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }

    /// Fraction of chunks this listener missed, 0.0 to 1.0
    pub fn drop_ratio(&self) -> f64 {
        let total = self.chunks_delivered + self.chunks_dropped;
        if total > 0 {
            self.chunks_dropped as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Hub-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Live generation, if any
    #[serde(rename = "active_generation")]
    pub generation: Option<u64>,
    /// Subscribers currently registered
    pub active_subscribers: usize,
    /// Subscribers ever registered
    pub total_subscribers: u64,
    /// Chunks read from the encoder and fanned out
    pub chunks_pumped: u64,
    /// Bytes read from the encoder and fanned out
    pub bytes_pumped: u64,
    /// Chunks dropped across all subscribers
    pub dropped_chunks: u64,
}

/// Snapshot reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Encoder lifecycle state
    pub state: SourceState,
    /// Most recently started generation
    pub last_generation: u64,
    #[serde(flatten)]
    pub hub: HubStats,
}
