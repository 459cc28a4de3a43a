//! Encoder process lifecycle
//!
//! [`SourceProcess`] owns the OS handle of the single running encoder. The
//! output pipe is handed off to a [`SourceReader`] at start, so the lock here
//! only ever guards state transitions, never a blocking read.

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{RelayError, Result};

use super::config::EncoderConfig;
use super::reader::SourceReader;

/// Lifecycle state of the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    /// No encoder; never started or explicitly stopped
    Stopped,
    /// Encoder is running and its output is being pumped
    Running,
    /// Encoder exited on its own
    Failed,
}

struct SourceInner {
    state: SourceState,
    generation: u64,
    child: Option<Child>,
    started_at: Option<Instant>,
}

/// Owner of the external encoder process
pub struct SourceProcess {
    inner: Mutex<SourceInner>,
}

impl SourceProcess {
    /// Create a stopped source at generation 0
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SourceInner {
                state: SourceState::Stopped,
                generation: 0,
                child: None,
                started_at: None,
            }),
        }
    }

    /// Spawn the encoder and return a reader for its stdout
    ///
    /// On success the state becomes `Running` and the generation id is
    /// incremented; the returned reader is tagged with the new generation.
    /// The encoder leads its own process group, so stopping it also stops
    /// anything it spawned.
    pub(crate) fn start(&self, config: &EncoderConfig, chunk_size: usize) -> Result<SourceReader> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or(RelayError::EmptyCommand)?;

        if self.is_running() {
            return Err(RelayError::AlreadyRunning);
        }

        let stderr = if config.capture_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(stderr);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| RelayError::SpawnFailure {
            command: program.clone(),
            source,
        })?;

        let Some(stdout) = child.stdout.take() else {
            terminate(child, 0);
            return Err(RelayError::SpawnFailure {
                command: program.clone(),
                source: std::io::Error::other("stdout was not captured"),
            });
        };
        let stderr = child.stderr.take();
        let pid = child.id();

        // Another start may have won the race while we were spawning
        let published = {
            let mut inner = self.inner.lock();
            if inner.state == SourceState::Running {
                Err(child)
            } else {
                inner.generation += 1;
                inner.state = SourceState::Running;
                inner.child = Some(child);
                inner.started_at = Some(Instant::now());
                Ok(inner.generation)
            }
        };

        let generation = match published {
            Ok(generation) => generation,
            Err(child) => {
                terminate(child, 0);
                return Err(RelayError::AlreadyRunning);
            }
        };

        if let Some(stderr) = stderr {
            spawn_stderr_logger(stderr, generation);
        }

        tracing::info!(
            generation = generation,
            pid = pid,
            command = ?config.command,
            "Encoder started"
        );

        Ok(SourceReader::new(generation, stdout, chunk_size))
    }

    /// Kill the running encoder
    ///
    /// Returns the generation that ended. Fails with `NotRunning` when no
    /// encoder is active, leaving the state untouched.
    pub(crate) fn stop(&self) -> Result<u64> {
        let (child, generation, uptime) = {
            let mut inner = self.inner.lock();
            if inner.state != SourceState::Running {
                return Err(RelayError::NotRunning);
            }
            inner.state = SourceState::Stopped;
            (
                inner.child.take(),
                inner.generation,
                inner.started_at.take().map(|t| t.elapsed()),
            )
        };

        tracing::info!(generation = generation, uptime = ?uptime, "Encoder stopped");

        if let Some(child) = child {
            terminate(child, generation);
        }

        Ok(generation)
    }

    /// Whether an encoder is currently running
    pub fn is_running(&self) -> bool {
        self.inner.lock().state == SourceState::Running
    }

    /// Current lifecycle state
    pub fn state(&self) -> SourceState {
        self.inner.lock().state
    }

    /// Id of the most recently started generation (0 before the first start)
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Called by the pump when a generation's pipe reached end-of-stream
    ///
    /// If that generation is still the running one, the encoder exited on
    /// its own and the state becomes `Failed`. Stale generations are ignored.
    pub(crate) fn on_exit(&self, generation: u64) {
        let child = {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.state != SourceState::Running {
                return;
            }
            inner.state = SourceState::Failed;
            inner.started_at = None;
            inner.child.take()
        };

        tracing::warn!(generation = generation, "Encoder exited unexpectedly");

        if let Some(child) = child {
            terminate(child, generation);
        }
    }

    /// Roll back a start whose pump could not be launched
    pub(crate) fn abort(&self, generation: u64) {
        let child = {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.state != SourceState::Running {
                return;
            }
            inner.state = SourceState::Stopped;
            inner.started_at = None;
            inner.child.take()
        };

        if let Some(child) = child {
            terminate(child, generation);
        }
    }
}

impl Default for SourceProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SourceProcess {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(child) = inner.child.take() {
            terminate(child, inner.generation);
        }
    }
}

/// Kill and reap an encoder process along with its process group
fn terminate(mut child: Child, generation: u64) {
    kill_group(&child, generation);
    // Fails only if the process was already reaped
    let _ = child.kill();

    match child.wait() {
        Ok(status) => {
            tracing::debug!(generation = generation, status = %status, "Encoder reaped");
        }
        Err(e) => {
            tracing::warn!(generation = generation, error = %e, "Failed to reap encoder");
        }
    }
}

#[cfg(unix)]
fn kill_group(child: &Child, generation: u64) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // Group id equals the leader's pid; the leader is not reaped yet
    match killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => {
            tracing::warn!(generation = generation, error = %e, "Failed to kill encoder process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child, _generation: u64) {}

/// Drain encoder stderr into the log so the encoder never blocks on it
fn spawn_stderr_logger(stderr: ChildStderr, generation: u64) {
    let result = thread::Builder::new()
        .name(format!("encoder-stderr-{generation}"))
        .spawn(move || {
            let mut reader = BufReader::new(stderr);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&line);
                        let text = text.trim_end();
                        if !text.is_empty() {
                            tracing::debug!(
                                target: "relay_rs::encoder",
                                generation = generation,
                                "{}",
                                text
                            );
                        }
                    }
                }
            }
        });

    if let Err(e) = result {
        tracing::warn!(generation = generation, error = %e, "Failed to spawn stderr logger");
    }
}
