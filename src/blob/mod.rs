//! Blob Module
//!
//! Append-only storage of opaque byte chunks, sharded across size-capped
//! files and addressed by `(file_index, offset, size)`.
//!
//! ## Responsibilities
//! - Discover existing blob files on startup (0, 1, 2, ... until one is missing)
//! - Append chunks to the single active file
//! - Rotate to a new file before a chunk would cross the size cap
//! - Random reads from any file
//!
//! ## File Layout
//! ```text
//! tiles0000000000   (read-only)   ┌─────────┬─────────┬─────┐
//!                                 │ chunk a │ chunk b │ ... │
//!                                 └─────────┴─────────┴─────┘
//! tiles0000000001   (read-only)   ┌─────────┬─────┐
//!                                 │ chunk c │ ... │
//!                                 └─────────┴─────┘
//! tiles0000000002   (active, rw)  ┌─────────┬──────── cursor
//!                                 │ chunk d │
//!                                 └─────────┘
//! ```
//!
//! Chunks carry no header; their boundaries only exist in the index.
//! Overwritten chunks are never reclaimed.

mod store;

pub use store::ChunkedBlobStore;

use crate::index::IndexEntry;

/// Location of one chunk in the blob store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    /// Sequential number of the blob file
    pub file_index: u16,
    /// Byte offset inside that file
    pub offset: u64,
    /// Chunk length in bytes
    pub size: u32,
}

impl From<ChunkLocation> for IndexEntry {
    fn from(loc: ChunkLocation) -> Self {
        IndexEntry::new(loc.file_index, loc.offset, loc.size)
    }
}
