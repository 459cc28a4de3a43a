use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relay-rs")]
#[command(author, version, about = "Relay a live encoder feed to HTTP listeners")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the control API and listener stream
    Serve {
        /// Address to bind to (overrides the config file)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Start the encoder immediately
        #[arg(long)]
        autostart: bool,
    },

    /// Write the default configuration to a file
    WriteConfig {
        /// Destination path
        #[arg(default_value = "relay.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate the configuration file
    CheckConfig,
}
