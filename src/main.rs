//! Multi-room WebSocket chat hub - Entry Point
//!
//! Starts the TCP listener and ChatHub actor, accepting connections.

use std::env;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use room_hub::{handle_connection, Config, HubHandle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // e.g., RUST_LOG=debug or RUST_LOG=room_hub=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("room_hub=info")),
        )
        .init();

    let mut config = Config::from_env()?;

    // Bind address from command line takes precedence
    if let Some(addr) = env::args().nth(1) {
        config.addr = addr;
    }

    let listener = TcpListener::bind(&config.addr).await?;
    info!("WebSocket chat hub listening on {}", config.addr);

    let hub = HubHandle::spawn(config.command_buffer);
    info!("ChatHub actor started");

    // Connection accept loop
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let hub = hub.clone();
                    let outbound_buffer = config.outbound_buffer;

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, hub, outbound_buffer).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    if let Err(e) = hub.shutdown().await {
        error!("Hub shutdown failed: {}", e);
    }

    Ok(())
}
