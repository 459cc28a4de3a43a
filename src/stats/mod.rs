//! Diagnostic counters

pub mod metrics;

pub use metrics::{HubStats, RelayStats, SessionStats};
