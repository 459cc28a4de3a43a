mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use relay_rs::{config, RelayServer};

async fn serve(
    config_path: Option<&Path>,
    bind: Option<std::net::SocketAddr>,
    autostart: bool,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }

    tracing::info!(
        addr = %config.server.bind_addr,
        encoder = ?config.encoder.command,
        chunk_size = config.hub.chunk_size,
        buffer_capacity = config.hub.buffer_capacity,
        "Starting relay"
    );

    let server = RelayServer::new(config);

    if autostart {
        let outcome = server.relay().start();
        if !outcome.ok {
            tracing::warn!(msg = %outcome.msg, "Autostart failed");
        }
    }

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")
}

fn write_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists (use --force to overwrite)", path);
    }
    config::write_default_config(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn check_config(path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(path)?;
    config.validate()?;
    println!("Configuration is valid");
    println!("{}", config.to_toml()?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "relay_rs=trace,tower_http=debug".to_string()
        } else {
            "relay_rs=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    match cli.command {
        Commands::Serve { bind, autostart } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(cli.config.as_deref(), bind, autostart))
        }
        Commands::WriteConfig { path, force } => write_config(&path, force),
        Commands::CheckConfig => check_config(cli.config.as_deref()),
    }
}
