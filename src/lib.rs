//! # Tuile
//!
//! A flat-file storage engine for a fixed-size grid of small binary tiles
//! (e.g. one zoom level of a map-tile pyramid) with:
//! - O(1) random access to any cell by `(col, row)`
//! - Sparse cells (absent tiles cost 15 bytes of index)
//! - Blob data sharded across size-capped, append-only files
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────────┐  ┌─────────────────┐  ┌────────────────────┐
//! │  Tile Server   │  │ check / rebuild │  │  import (dir→grid) │
//! │  (HTTP, axum)  │  │     (tools)     │  │      (tools)       │
//! └───────┬────────┘  └────────┬────────┘  └─────────┬──────────┘
//!         └────────────────────┼─────────────────────┘
//!                              ▼
//!                    ┌───────────────────┐
//!                    │    TileStorage    │
//!                    │  (info.json cfg)  │
//!                    └─────────┬─────────┘
//!                 ┌────────────┴────────────┐
//!                 ▼                         ▼
//!        ┌─────────────────┐      ┌──────────────────┐
//!        │ BinaryGridIndex │      │ ChunkedBlobStore │
//!        │ (15 B / cell)   │      │ (append, rotate) │
//!        └─────────────────┘      └──────────────────┘
//! ```
//!
//! Writes go to the blob store first, then the index. Reads go to the index
//! first, then the blob store.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod index;
pub mod blob;
pub mod engine;
pub mod tools;
pub mod server;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TuileError, Result};
pub use config::{ServerConfig, StorageConfig};
pub use engine::{storage_path, TileStorage};
pub use index::IndexEntry;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Tuile
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
