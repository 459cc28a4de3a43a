//! File-backed relay configuration
//!
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0:8000"
//! player_path = "player.html"
//!
//! [encoder]
//! command = ["ffmpeg", "-f", "pulse", "-i", "default", "-f", "mp3", "pipe:1"]
//!
//! [hub]
//! chunk_size = 4096
//! buffer_capacity = 256
//!
//! [metadata]
//! initial_title = "DJ is offline"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hub::HubConfig;
use crate::metadata::MetadataConfig;
use crate::server::ServerConfig;
use crate::source::EncoderConfig;

/// Config file looked up when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "relay.toml";

/// Complete relay configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub encoder: EncoderConfig,
    pub hub: HubConfig,
    pub metadata: MetadataConfig,
}

impl RelayConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.encoder.program().map_or(true, str::is_empty) {
            return Err(ConfigError::Invalid("encoder command is empty".into()));
        }
        if self.hub.chunk_size == 0 {
            return Err(ConfigError::Invalid("hub chunk_size must be > 0".into()));
        }
        if self.hub.buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "hub buffer_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: RelayConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    config.validate()?;
    Ok(config)
}

/// Load from `custom_path`, else `./relay.toml`, else defaults
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return load_config(&default_path);
    }

    tracing::debug!("No config file found, using defaults");
    Ok(RelayConfig::default())
}

/// Write the default configuration to `path`
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let content = RelayConfig::default().to_toml()?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_validates() {
        assert!(RelayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind_addr = "127.0.0.1:8123"

[hub]
buffer_capacity = 16
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.server.bind_addr.port(), 8123);
        assert_eq!(config.hub.buffer_capacity, 16);
        assert_eq!(config.hub.chunk_size, 4096);
        assert_eq!(config.encoder, EncoderConfig::default());
        assert_eq!(config.metadata.initial_title, "DJ is offline");
    }

    #[test]
    fn test_rejects_empty_command() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[encoder]\ncommand = []").unwrap();

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = RelayConfig {
            hub: HubConfig::default().buffer_capacity(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hub\nchunk_size = ").unwrap();

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/relay_xyz.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");

        write_default_config(&path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded, RelayConfig::default());
    }
}
