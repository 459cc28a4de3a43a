//! Live audio relay
//!
//! Relays the output of one external encoder process to any number of
//! HTTP listeners. A dedicated pump thread reads the encoder's stdout and
//! copies each chunk into a bounded buffer per listener; a listener that
//! falls behind loses chunks instead of slowing anyone else down.
//!
//! ```no_run
//! use relay_rs::{RelayConfig, RelayServer};
//!
//! # async fn example() -> std::io::Result<()> {
//! let server = RelayServer::new(RelayConfig::default());
//! server.relay().start();
//! server.run().await
//! # }
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod hub;
pub mod metadata;
pub mod server;
pub mod session;
pub mod source;
pub mod stats;

pub use config::RelayConfig;
pub use control::{ControlOutcome, Relay};
pub use error::{ConfigError, RelayError, Result};
pub use hub::BroadcastHub;
pub use metadata::{MetadataStore, NowPlaying};
pub use server::{RelayServer, ServerConfig};
pub use session::SubscriberSession;
pub use source::{EncoderConfig, SourceProcess, SourceState};
pub use stats::{HubStats, RelayStats, SessionStats};
