//! netrpc Server Binary
//!
//! Serves the demo HelloService over TCP.

use std::sync::Arc;

use clap::Parser;
use netrpc::protocol::HEADER_LENGTH;
use netrpc::service::hello_service;
use netrpc::{Server, ServerConfig, ServiceRegistry};
use tracing_subscriber::{fmt, EnvFilter};

/// netrpc Server
#[derive(Parser, Debug)]
#[command(name = "netrpc-server")]
#[command(about = "Binary RPC server hosting the demo HelloService")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:20820")]
    listen: String,

    /// Server-side call timeout in ms (0 = defer to the client)
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    /// Close connections idle for this long (ms)
    #[arg(short, long, default_value = "5000")]
    read_idle_ms: u64,

    /// Per-write timeout for responses in ms
    #[arg(long, default_value = "3000")]
    write_timeout_ms: u64,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Threads per worker pool
    #[arg(short, long, default_value = "16")]
    workers: usize,

    /// Maximum body size in bytes
    #[arg(long, default_value = "1048576")]
    max_payload: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,netrpc=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("netrpc Server v{}", netrpc::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = ServerConfig::builder()
        .listen_addr(&args.listen)
        .timeout_ms(args.timeout_ms)
        .read_idle_ms(args.read_idle_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .max_frame_length(HEADER_LENGTH + args.max_payload)
        .build();

    let registry = Arc::new(ServiceRegistry::new());
    if let Err(e) = registry.register_table(hello_service()) {
        tracing::error!("Failed to register services: {}", e);
        std::process::exit(1);
    }

    let server = match Server::bind(config, registry) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
