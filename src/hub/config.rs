//! Hub configuration

use serde::{Deserialize, Serialize};

use crate::source::DEFAULT_CHUNK_SIZE;

/// Default per-subscriber capacity in chunks (about 1 MB at 4 KB chunks)
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Fan-out tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Bytes read from the encoder per pump iteration
    pub chunk_size: usize,

    /// Chunks each subscriber may have queued before new chunks are dropped
    pub buffer_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl HubConfig {
    /// Set the read block size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the per-subscriber capacity
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.buffer_capacity, 256);
        // ~1 MB of buffered audio per subscriber
        assert_eq!(config.chunk_size * config.buffer_capacity, 1024 * 1024);
    }

    #[test]
    fn test_builder_chaining() {
        let config = HubConfig::default().chunk_size(1024).buffer_capacity(8);

        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.buffer_capacity, 8);
    }
}
