//! muxrpc - multiplexed RPC server
//!
//! Serves the built-in `echo`, `ping` and `info` operations over TCP.

use muxrpc::{bytes_service, register_builtins};
use muxrpc_server::{Config, Listener, ServiceOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if MUXRPC_CONFIG is set, then env overrides)
    let config_path = std::env::var("MUXRPC_CONFIG").ok();
    let config = match Config::load() {
        Ok(c) => {
            if let Some(ref path) = config_path {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // An explicitly named config file must load
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting {} {}", muxrpc::NAME, muxrpc::VERSION);
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Max connections: {}", config.network.max_connections);
    tracing::info!("  Max frame size: {} bytes", config.transport.max_frame_size);

    let service = bytes_service(ServiceOptions::new());
    register_builtins(&service)?;

    let listener = Listener::bind(config).await?;

    let shutdown = service.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown.stop();
    });

    // Blocks until the service is stopped
    listener.run(&service).await?;

    tracing::info!("Server stopped");
    Ok(())
}
