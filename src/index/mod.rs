//! Index Module
//!
//! Fixed-width, randomly addressable table mapping grid cells to the location
//! of their bytes in the blob store.
//!
//! ## Responsibilities
//! - Allocate the whole table at creation (every cell starts absent)
//! - O(1) lookup and overwrite of a single cell
//! - Row-major iteration over all cells, optionally filtered by flags
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Entry (0,0) │ Entry (1,0) │ ... │ Entry (cols-1,rows-1)  │
//! └──────────────────────────────────────────────────────────┘
//!
//! Entry (15 bytes, big-endian, no padding):
//! ┌───────────────┬────────────┬──────────┬───────────┐
//! │ FileIndex (2) │ Offset (8) │ Size (4) │ Flags (1) │
//! └───────────────┴────────────┴──────────┴───────────┘
//! ```
//!
//! Entry for `(col, row)` lives at byte `(row * columns + col) * 15`.
//! A `size` of zero means the cell is empty. The file length is always
//! exactly `columns * rows * 15`.

mod entry;
mod grid;
mod iterator;

pub use entry::{IndexEntry, ENTRY_SIZE};
pub use grid::BinaryGridIndex;
pub use iterator::{GridCoords, MaskedCoords};
