//! Encoder configuration

use serde::{Deserialize, Serialize};

/// Command line used to launch the encoder
///
/// The encoder must write its encoded stream to stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Program followed by its arguments
    pub command: Vec<String>,

    /// Forward encoder stderr lines to the log
    pub capture_stderr: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            command: [
                "ffmpeg",
                "-f",
                "pulse",
                "-i",
                "default",
                "-vn",
                "-acodec",
                "libmp3lame",
                "-b:a",
                "128k",
                "-f",
                "mp3",
                "pipe:1",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            capture_stderr: true,
        }
    }
}

impl EncoderConfig {
    /// Create a config running the given program and arguments
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Enable or disable stderr forwarding
    pub fn capture_stderr(mut self, enabled: bool) -> Self {
        self.capture_stderr = enabled;
        self
    }

    /// Program to execute, if any
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ffmpeg_mp3_to_stdout() {
        let config = EncoderConfig::default();

        assert_eq!(config.program(), Some("ffmpeg"));
        assert_eq!(config.command.last().map(String::as_str), Some("pipe:1"));
        assert!(config.capture_stderr);
    }

    #[test]
    fn test_new() {
        let config = EncoderConfig::new(["cat", "/dev/zero"]).capture_stderr(false);

        assert_eq!(config.command, vec!["cat".to_string(), "/dev/zero".to_string()]);
        assert!(!config.capture_stderr);
    }

    #[test]
    fn test_empty_command_has_no_program() {
        let config = EncoderConfig::new(Vec::<String>::new());
        assert_eq!(config.program(), None);
    }
}
