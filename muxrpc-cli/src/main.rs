//! muxrpc-cli - Command-line client for muxrpc servers
//!
//! Connects, issues one call, prints the result and exits.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use muxrpc_client::{Client, ClientOptions};
use muxrpc_transport::{TcpConfig, TcpConnection};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "muxrpc-cli")]
#[command(about = "Command-line client for muxrpc servers")]
#[command(version)]
struct Cli {
    /// Server address
    #[arg(short, long, env = "MUXRPC_ADDR", default_value = "127.0.0.1:7501")]
    addr: SocketAddr,

    /// Request timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Ping the server
    Ping,

    /// Show server name and version
    Info,

    /// Call an operation
    Call {
        /// Operation name
        operation: String,

        /// Request body (or @file to read it from a file)
        body: Option<String>,

        /// Pretty-print the response as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_millis(cli.timeout_ms);

    let conn = TcpConnection::new(TcpConfig::new(cli.addr).with_connect_timeout(timeout));
    let client = Client::new(
        conn.clone(),
        commands::encode_body,
        commands::decode_body,
        ClientOptions::new().with_request_timeout(timeout),
    );

    tracing::debug!("Connecting to {}", cli.addr);
    if let Err(e) = conn.connect().await {
        tracing::debug!("Connect to {} failed: {}", cli.addr, e);
        eprintln!("{}: {}", "Connection failed".red(), e);
        std::process::exit(1);
    }

    tracing::debug!("Connected to {}", cli.addr);

    let result = commands::execute(&client, cli.command).await;
    conn.close();
    tracing::debug!("Connection closed");

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
