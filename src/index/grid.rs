//! Binary Grid Index
//!
//! Opens the index file and provides O(1) entry reads and overwrites.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::EntryLayout;
use crate::error::{Result, TuileError};

use super::iterator::{GridCoords, MaskedCoords};
use super::{IndexEntry, ENTRY_SIZE};

/// Fixed-width table of entries over a `columns x rows` grid
pub struct BinaryGridIndex {
    /// Index file handle (read-write)
    file: File,
    /// Path of the index file
    path: PathBuf,
    columns: u32,
    rows: u32,
    layout: EntryLayout,
}

impl BinaryGridIndex {
    /// Create a zero-filled index of exactly `columns * rows` entries
    ///
    /// An existing file at `path` is truncated and reallocated.
    pub fn create(path: &Path, columns: u32, rows: u32, layout: EntryLayout) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let index_len = columns as u64 * rows as u64 * layout.entry_size();
        file.set_len(index_len)?;

        tracing::debug!(
            "Created index {} for {}x{} grid ({} bytes)",
            path.display(),
            columns,
            rows,
            index_len
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            columns,
            rows,
            layout,
        })
    }

    /// Open an existing index for reading and writing
    ///
    /// Fails if the file length does not match the grid dimensions.
    pub fn open(path: &Path, columns: u32, rows: u32, layout: EntryLayout) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let expected = columns as u64 * rows as u64 * layout.entry_size();
        let actual = file.metadata()?.len();
        if actual != expected {
            return Err(TuileError::Config(format!(
                "Index {} has length {}, expected {} for a {}x{} grid",
                path.display(),
                actual,
                expected,
                columns,
                rows
            )));
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            columns,
            rows,
            layout,
        })
    }

    /// Read the entry of a cell
    pub fn get_entry(&mut self, col: u32, row: u32) -> Result<IndexEntry> {
        let position = self.entry_position(col, row)?;
        self.file.seek(SeekFrom::Start(position))?;

        let mut buf = [0u8; ENTRY_SIZE];
        self.file.read_exact(&mut buf)?;

        Ok(IndexEntry::decode(&buf))
    }

    /// Replace the whole entry of a cell
    pub fn set_entry(&mut self, col: u32, row: u32, entry: IndexEntry) -> Result<()> {
        let position = self.entry_position(col, row)?;
        self.file.seek(SeekFrom::Start(position))?;
        self.file.write_all(&entry.encode())?;
        Ok(())
    }

    /// Every `(col, row)` in row-major order
    pub fn coords(&self) -> GridCoords {
        GridCoords::new(self.columns, self.rows)
    }

    /// Coordinates whose entry flags share a bit with `mask`
    pub fn coords_masked(&mut self, mask: u8) -> MaskedCoords<'_> {
        MaskedCoords::new(self, mask)
    }

    /// Grid dimensions as `(columns, rows)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Number of cells
    pub fn len(&self) -> u64 {
        self.columns as u64 * self.rows as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current on-disk length of the index file
    pub fn file_len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Sync and release the file handle
    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Byte offset of a cell's entry, or OutOfRange
    fn entry_position(&self, col: u32, row: u32) -> Result<u64> {
        if col >= self.columns || row >= self.rows {
            return Err(TuileError::OutOfRange {
                col,
                row,
                columns: self.columns,
                rows: self.rows,
            });
        }

        let cell = row as u64 * self.columns as u64 + col as u64;
        Ok(cell * self.layout.entry_size())
    }
}
