//! HTTP transport
//!
//! Thin glue exposing the control plane and listener streams over HTTP.

pub mod config;
pub mod listener;
pub mod routes;

pub use config::ServerConfig;
pub use listener::RelayServer;
pub use routes::create_router;
