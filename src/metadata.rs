//! "Now playing" metadata
//!
//! A single process-wide title, last write wins.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Title shown before anyone sets one
pub const DEFAULT_TITLE: &str = "DJ is offline";

/// Current metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub song: String,
}

/// Metadata configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Title reported until the first update
    pub initial_title: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            initial_title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Holder of the current title
#[derive(Debug)]
pub struct MetadataStore {
    current: RwLock<NowPlaying>,
}

impl MetadataStore {
    /// Create a store with the given initial title
    pub fn new(initial_title: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(NowPlaying {
                song: initial_title.into(),
            }),
        }
    }

    /// Current record
    pub fn get(&self) -> NowPlaying {
        self.current.read().clone()
    }

    /// Replace the title and return the new record
    pub fn set(&self, song: impl Into<String>) -> NowPlaying {
        let mut current = self.current.write();
        current.song = song.into();
        current.clone()
    }

    /// Apply an optional update; a missing or empty title leaves the record
    /// unchanged, anything else is stored as given
    pub fn update(&self, song: Option<&str>) -> NowPlaying {
        match song {
            Some(song) if !song.is_empty() => self.set(song),
            _ => self.get(),
        }
    }
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}
