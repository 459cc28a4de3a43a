//! Listener sessions
//!
//! Each connected listener is served by its own [`SubscriberSession`],
//! drained concurrently with the pump and with every other session.

pub mod subscriber;

pub use subscriber::SubscriberSession;
