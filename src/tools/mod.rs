//! Tools Module
//!
//! Offline maintenance built on top of the engine's public API.
//!
//! ## Tools
//! - `check`: decode every tile, count and optionally clear invalid ones
//! - `rebuild`: copy live tiles into a fresh storage, dropping orphaned bytes
//! - `import`: build a storage from a directory of `tile-<row>x<col>.<ext>` files
//!
//! The engine treats tiles as opaque bytes; interpreting them is confined to
//! the [`TileDecoder`] seam used here.

mod check;
mod import;
mod rebuild;

pub use check::{check, check_with, CheckOptions, CheckReport};
pub use import::{import_dir, import_dir_with, parse_tile_filename, ImportOptions, ImportReport};
pub use rebuild::{rebuild, rebuild_with, RebuildOptions, RebuildReport};

use crate::error::{Result, TuileError};

/// Validates tile content
pub trait TileDecoder {
    /// `Ok(())` if the bytes are a usable tile, `Err(Decode)` otherwise
    fn decode(&self, bytes: &[u8]) -> Result<()>;
}

/// Accepts any image format the `image` crate can decode
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl TileDecoder for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<()> {
        image::load_from_memory(bytes)
            .map(|_| ())
            .map_err(|e| TuileError::Decode(e.to_string()))
    }
}
