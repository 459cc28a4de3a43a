//! Broadcast hub for fan-out from the encoder to listeners
//!
//! The hub moves chunks from the single source to every live subscriber
//! buffer without ever letting one listener stall the pipeline.
//!
//! # Architecture
//!
//! ```text
//!   [Encoder stdout]
//!          │ read_chunk() (blocking, no locks held)
//!          ▼
//!   [Pump thread] ──► hub.broadcast(generation, chunk)
//!                          │ snapshot of subscriber set
//!          ┌───────────────┼───────────────┐
//!          ▼               ▼               ▼
//!   SubscriberBuffer SubscriberBuffer SubscriberBuffer   (bounded mpsc, try_send drops on full)
//!          │               │               │
//!          ▼               ▼               ▼
//!   [Session task]  [Session task]  [Session task] ──► HTTP body
//! ```
//!
//! # Zero-Copy Design
//!
//! Chunks are `bytes::Bytes`, so each subscriber's copy is a reference-count
//! bump on the same allocation.
//!
//! # Generations
//!
//! Every encoder run is a generation. Buffers are tagged with the generation
//! they were created under; when it ends they receive an end-of-stream marker
//! and are never written to again.

pub mod buffer;
pub mod config;
pub mod pump;
pub mod store;

pub use buffer::{PushOutcome, SubscriberBuffer};
pub use config::{HubConfig, DEFAULT_BUFFER_CAPACITY};
pub use pump::{spawn_pump, PumpExit, PumpSummary};
pub use store::BroadcastHub;
