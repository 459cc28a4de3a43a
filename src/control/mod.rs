//! Control plane
//!
//! Translates start/stop/subscribe/metadata calls into operations on the
//! source, hub and metadata store, and reports structured outcomes.

pub mod outcome;
pub mod relay;

pub use outcome::ControlOutcome;
pub use relay::Relay;
