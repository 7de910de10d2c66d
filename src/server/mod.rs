//! Server Module
//!
//! HTTP tile server over a directory of storages.
//!
//! ## Architecture
//! - axum router on a multi-threaded tokio runtime
//! - Storages resolved at `<base>/<dataset>/<zoom>.tuiles`
//! - Bounded cache of open storages, evicting the least recently used
//! - Engine calls are blocking and run on the blocking thread pool, one
//!   request at a time per storage (each engine sits behind a mutex)
//!
//! ## Routes
//! - `GET /health` → `ok`
//! - `GET /{dataset}/{zoom}/{row}/{col}.{ext}` → raw tile bytes, `404` when
//!   the storage or the tile does not exist

mod cache;
mod routes;

pub use cache::{SharedStorage, StorageCache};
pub use routes::{create_router, AppState, TileRequest};

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::{Result, TuileError};

/// HTTP server for Tuile storages
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a new server with the given config
    pub fn new(config: ServerConfig) -> Self {
        let cache = StorageCache::new(&config.base_dir, config.cache_capacity);
        Self {
            config,
            state: AppState {
                cache: Arc::new(cache),
            },
        }
    }

    /// Shared state handed to every request
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until Ctrl+C
    pub async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|e| {
                TuileError::Network(format!("Failed to bind {}: {}", self.config.listen_addr, e))
            })?;

        tracing::info!(
            "Serving {} on {}",
            self.config.base_dir.display(),
            self.config.listen_addr
        );

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| TuileError::Network(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, initiating shutdown...");
}
