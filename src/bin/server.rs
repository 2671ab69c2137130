//! cmdlog Server Binary
//!
//! Starts the TCP server in front of a command log engine.

use std::sync::Arc;
use clap::Parser;
use cmdlog::{Config, Engine};
use cmdlog::network::Server;
use tracing_subscriber::{fmt, EnvFilter};

/// cmdlog Server
#[derive(Parser, Debug)]
#[command(name = "cmdlog-server")]
#[command(about = "Bounded in-memory command log served over TCP")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:9000")]
    listen: String,

    /// Number of commands retained before the oldest is evicted
    #[arg(short, long, default_value = "10")]
    capacity: usize,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "5")]
    max_connections: usize,

    /// Seconds between timestamp commands (0 disables them)
    #[arg(short, long, default_value = "10")]
    timestamp_secs: u64,

    /// Receive buffer size per connection, in bytes
    #[arg(long, default_value = "1024")]
    recv_buffer: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cmdlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("cmdlog Server v{}", cmdlog::VERSION);
    tracing::info!("Listen address: {}", args.listen);
    tracing::info!("Capacity: {} commands", args.capacity);

    // Build config from args
    let interval_ms = timestamp_interval_ms(args.timestamp_secs);
    let config = Config::builder()
        .listen_addr(&args.listen)
        .capacity(args.capacity)
        .max_connections(args.max_connections)
        .recv_buffer_size(args.recv_buffer)
        .timestamp_interval_ms(interval_ms)
        .build();

    // Create engine
    let engine = match Engine::new(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to create engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    // Start server
    let mut server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Stop on SIGINT / SIGTERM
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal");
        shutdown.shutdown();
    }) {
        tracing::warn!("Failed to install signal handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    drop(server);
    if let Ok(engine) = Arc::try_unwrap(engine) {
        let report = engine.close();
        tracing::info!(
            "Released {} commands ({} pending bytes discarded)",
            report.entries_released,
            report.pending_bytes_discarded
        );
    }

    tracing::info!("Server stopped");
}

/// Ticker interval in milliseconds; 0 seconds disables the ticker
fn timestamp_interval_ms(secs: u64) -> Option<u64> {
    match secs {
        0 => None,
        secs => Some(secs.saturating_mul(1000)),
    }
}
