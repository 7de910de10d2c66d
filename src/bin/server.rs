//! Tuile Server Binary
//!
//! Serves tiles from a directory of storages over HTTP.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use tuile::server::Server;
use tuile::ServerConfig;

/// Tuile tile server
#[derive(Parser, Debug)]
#[command(name = "tuile-server")]
#[command(about = "Serve map tiles from Tuile storages")]
#[command(version)]
struct Args {
    /// Directory holding <dataset>/<zoom>.tuiles storages
    #[arg(short, long, default_value = "./maps")]
    base_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Maximum number of storages kept open
    #[arg(short, long, default_value = "64")]
    cache_capacity: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tuile=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Tuile Server v{}", tuile::VERSION);
    tracing::info!("Base directory: {}", args.base_dir);
    tracing::info!("Listen address: {}", args.listen);

    let config = ServerConfig::builder()
        .base_dir(&args.base_dir)
        .listen_addr(&args.listen)
        .cache_capacity(args.cache_capacity)
        .build();

    if let Err(e) = Server::new(config).run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
