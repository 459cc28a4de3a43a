//! Error types
//!
//! Relay operations fail with [`RelayError`]; loading configuration fails
//! with [`ConfigError`].

use std::io;
use std::path::PathBuf;

/// Result alias for relay operations
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Error type for source, hub and control operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// `start` was called while an encoder is already running
    #[error("Already running")]
    AlreadyRunning,

    /// `stop` was called with no encoder running
    #[error("Not running")]
    NotRunning,

    /// The encoder executable could not be launched
    #[error("Failed to spawn encoder `{command}`: {source}")]
    SpawnFailure {
        /// Program that failed to launch
        command: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Encoder command line has no program
    #[error("Encoder command is empty")]
    EmptyCommand,

    /// The pump thread for a new generation could not be created
    #[error("Failed to spawn pump thread: {0}")]
    PumpSpawn(#[source] io::Error),

    /// Subscribe was attempted with no generation running
    #[error("Stream is not running")]
    StreamUnavailable,

    /// Writing to a listener failed; terminates only that listener's session
    #[error("Transport write failed: {0}")]
    TransportWrite(#[source] io::Error),
}

impl RelayError {
    /// HTTP status code the transport layer should report for this error
    pub fn http_status(&self) -> u16 {
        match self {
            RelayError::StreamUnavailable => 503,
            RelayError::AlreadyRunning | RelayError::NotRunning => 409,
            RelayError::TransportWrite(_) => 502,
            RelayError::SpawnFailure { .. }
            | RelayError::EmptyCommand
            | RelayError::PumpSpawn(_) => 500,
        }
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read or written
    #[error("Failed to access config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML for [`crate::config::RelayConfig`]
    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The default config could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}
