//! Relay instance and control surface
//!
//! [`Relay`] owns every component as a field: the encoder process, the hub,
//! and the metadata store. Independent instances share nothing, so tests can
//! run as many as they like side by side.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::hub::{spawn_pump, BroadcastHub};
use crate::metadata::{MetadataStore, NowPlaying};
use crate::session::SubscriberSession;
use crate::source::{SourceProcess, SourceState};
use crate::stats::RelayStats;

use super::outcome::ControlOutcome;

/// Live audio relay
pub struct Relay {
    config: RelayConfig,
    source: Arc<SourceProcess>,
    hub: Arc<BroadcastHub>,
    metadata: MetadataStore,
}

impl Relay {
    /// Create a stopped relay
    pub fn new(config: RelayConfig) -> Self {
        let hub = Arc::new(BroadcastHub::with_config(config.hub.clone()));
        let metadata = MetadataStore::new(config.metadata.initial_title.clone());

        Self {
            config,
            source: Arc::new(SourceProcess::new()),
            hub,
            metadata,
        }
    }

    /// Configuration the relay was built with
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// The broadcast hub
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// The encoder process owner
    ///
    /// Read-only outside the crate; the encoder is started and stopped
    /// through the relay so the hub and pump follow it.
    ///
    /// ```compile_fail
    /// use relay_rs::{Relay, RelayConfig};
    ///
    /// let relay = Relay::new(RelayConfig::default());
    /// let _reader = relay.source().start(&relay.config().encoder, 4096);
    /// ```
    pub fn source(&self) -> &SourceProcess {
        &self.source
    }

    /// The metadata store
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Start the encoder and its pump; returns the new generation id
    ///
    /// No lock is held while the process is spawned. If a concurrent stop and
    /// restart overtake this call, the hub keeps the newer generation and the
    /// pump started here exits on its own.
    pub fn try_start(&self) -> Result<u64> {
        let reader = self
            .source
            .start(&self.config.encoder, self.config.hub.chunk_size)?;
        let generation = reader.generation();
        if !self.hub.open_generation(generation) {
            tracing::debug!(generation = generation, "Generation overtaken before it opened");
        }

        let source = Arc::clone(&self.source);
        let pump = spawn_pump(Arc::clone(&self.hub), reader, move |summary| {
            source.on_exit(summary.generation);
        });

        if let Err(e) = pump {
            tracing::error!(generation = generation, error = %e, "Failed to spawn pump thread");
            self.hub.close_generation(generation);
            self.source.abort(generation);
            return Err(RelayError::PumpSpawn(e));
        }

        Ok(generation)
    }

    /// Kill the encoder and end its generation; returns the ended id
    ///
    /// Every subscriber receives its end-of-stream marker before this
    /// returns.
    pub fn try_stop(&self) -> Result<u64> {
        let generation = self.source.stop()?;
        self.hub.close_generation(generation);
        Ok(generation)
    }

    /// `start` control call
    pub fn start(&self) -> ControlOutcome {
        ControlOutcome::from_result(self.try_start(), "Started")
    }

    /// `stop` control call
    pub fn stop(&self) -> ControlOutcome {
        ControlOutcome::from_result(self.try_stop(), "Stopped")
    }

    /// Whether the encoder is running
    pub fn is_running(&self) -> bool {
        self.source.is_running()
    }

    /// Encoder lifecycle state
    pub fn state(&self) -> SourceState {
        self.source.state()
    }

    /// Attach a new listener
    ///
    /// Fails with `StreamUnavailable` when nothing is being broadcast.
    pub fn subscribe(&self) -> Result<SubscriberSession> {
        SubscriberSession::open(&self.hub)
    }

    /// Current metadata record
    pub fn now_playing(&self) -> NowPlaying {
        self.metadata.get()
    }

    /// Update the title; a missing or empty title leaves it unchanged
    pub fn set_now_playing(&self, song: Option<&str>) -> NowPlaying {
        self.metadata.update(song)
    }

    /// Diagnostic counters
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            state: self.source.state(),
            last_generation: self.source.generation(),
            hub: self.hub.stats(),
        }
    }

    /// Stop the encoder if it is running
    pub fn shutdown(&self) {
        match self.try_stop() {
            Ok(generation) => {
                tracing::info!(generation = generation, "Encoder stopped for shutdown");
            }
            Err(RelayError::NotRunning) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to stop encoder on shutdown"),
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        // The pump holds the source alive until its pipe closes
        self.shutdown();
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("state", &self.source.state())
            .field("generation", &self.source.generation())
            .field("subscribers", &self.hub.subscriber_count())
            .finish()
    }
}
