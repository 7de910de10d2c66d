//! Error types for Tuile
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias using TuileError
pub type Result<T> = std::result::Result<T, TuileError>;

/// Unified error type for Tuile operations
#[derive(Debug, Error)]
pub enum TuileError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Grid Errors
    // -------------------------------------------------------------------------
    #[error("Coordinate ({col}, {row}) outside grid of {columns}x{rows}")]
    OutOfRange {
        col: u32,
        row: u32,
        columns: u32,
        rows: u32,
    },

    #[error("Tile ({col}, {row}) is absent")]
    AbsentTile { col: u32, row: u32 },

    // -------------------------------------------------------------------------
    // Blob Store Errors
    // -------------------------------------------------------------------------
    #[error("Chunk of {size} bytes does not fit in a blob file of {max} bytes")]
    ChunkTooLarge { size: u64, max: u64 },

    #[error("Blob file {file_index} does not exist ({file_count} files open)")]
    BlobFileMissing { file_index: u16, file_count: usize },

    #[error("Blob file limit of {0} files reached")]
    BlobFileLimit(usize),

    // -------------------------------------------------------------------------
    // Storage Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Storage already exists: {}", .0.display())]
    StorageExists(PathBuf),

    #[error("Storage used after close")]
    UseAfterClose,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Tile Content Errors (tools only, never raised by the engine)
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Import error: {0}")]
    Import(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    /// Error shared by every request that waited on the same storage open
    #[error(transparent)]
    Shared(Arc<TuileError>),
}

impl From<Arc<TuileError>> for TuileError {
    fn from(e: Arc<TuileError>) -> Self {
        Arc::try_unwrap(e).unwrap_or_else(TuileError::Shared)
    }
}

impl From<serde_json::Error> for TuileError {
    fn from(e: serde_json::Error) -> Self {
        TuileError::Serialization(e.to_string())
    }
}
