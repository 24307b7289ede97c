//! Line-based TCP Chat Server - Entry Point
//!
//! Resolves configuration, binds the listener and runs until SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use line_chat_server::{ChatServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "line_chat_server", version, about)]
struct Cli {
    /// TOML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Longest inbound line accepted, in bytes
    #[arg(long)]
    max_line_length: Option<usize>,

    /// Per-session outbound queue capacity
    #[arg(long)]
    outbound_queue: Option<usize>,

    /// Milliseconds to wait for sessions on shutdown
    #[arg(long)]
    shutdown_grace_ms: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, line_chat_server::AppError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max_line_length) = self.max_line_length {
            config.max_line_length = max_line_length;
        }
        if let Some(outbound_queue) = self.outbound_queue {
            config.outbound_queue = outbound_queue;
        }
        if let Some(shutdown_grace_ms) = self.shutdown_grace_ms {
            config.shutdown_grace_ms = shutdown_grace_ms;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=line_chat_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("line_chat_server=info")),
        )
        .init();

    let config = Cli::parse().into_config()?;

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => {
                info!("Shutdown signal received");
                shutdown_token.cancel();
            }
            Err(e) => error!("Error waiting for shutdown signal: {}", e),
        }
    });

    let server = ChatServer::bind(config, cancel_token).await?;
    server.run().await?;

    Ok(())
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
