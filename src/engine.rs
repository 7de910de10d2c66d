//! Engine Module
//!
//! The tile storage engine that composes the grid index and the blob store.
//!
//! ## Responsibilities
//! - Create and open storage directories, persisting their configuration
//! - Route tile reads through index → blob store
//! - Route tile writes through blob store → index
//! - Guarantee both components are released on close or drop
//!
//! ## Directory Layout
//! ```text
//! {name}.tuiles/
//!   ├── info.json          (StorageConfig)
//!   ├── index              (columns * rows * 15 bytes)
//!   ├── tiles0000000000    (blob file 0)
//!   └── tiles0000000001    (blob file 1, after rotation)
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::blob::ChunkedBlobStore;
use crate::config::StorageConfig;
use crate::error::{Result, TuileError};
use crate::index::{BinaryGridIndex, GridCoords, IndexEntry, MaskedCoords};

/// Extension carried by every storage directory
pub const STORAGE_SUFFIX: &str = "tuiles";

/// Apply the storage suffix to a path, replacing any existing extension
///
/// `maps/paris` and `maps/paris.json` both become `maps/paris.tuiles`.
pub fn storage_path(path: &Path) -> PathBuf {
    path.with_extension(STORAGE_SUFFIX)
}

/// Handles owned while the storage is open
struct OpenStorage {
    index: BinaryGridIndex,
    blobs: ChunkedBlobStore,
}

/// The tile storage engine
///
/// ## Lifecycle
/// `create`/`open` → OPEN → `close` → CLOSED (terminal). Every tile operation
/// on a closed storage fails with `UseAfterClose`. Dropping an open storage
/// closes it.
///
/// ## Concurrency
/// Single writer, no internal locking and no file locking. Several processes
/// may open the same storage for reading; concurrent writing (or reading
/// while another process writes) is undefined and must be prevented by the
/// caller.
pub struct TileStorage {
    /// Storage directory
    path: PathBuf,

    /// Configuration read from (or written to) `info.json`
    config: StorageConfig,

    /// `None` once closed
    state: Option<OpenStorage>,
}

impl TileStorage {
    /// Create a new storage with default settings
    ///
    /// The storage suffix is applied to `path`; the resulting directory must
    /// not exist yet.
    pub fn create(path: &Path, (columns, rows): (u32, u32)) -> Result<Self> {
        Self::create_with_config(path, StorageConfig::new(columns, rows))
    }

    /// Create a new storage with explicit settings
    ///
    /// Steps:
    /// 1. Create the storage directory (fails if it exists)
    /// 2. Write `info.json`
    /// 3. Allocate the zero-filled index
    /// 4. Create blob file 0
    pub fn create_with_config(path: &Path, config: StorageConfig) -> Result<Self> {
        config.validate()?;

        let dir = storage_path(path);
        if dir.exists() {
            return Err(TuileError::StorageExists(dir));
        }
        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir(&dir).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => TuileError::StorageExists(dir.clone()),
            _ => TuileError::Io(e),
        })?;

        config.save(&dir)?;

        let index = BinaryGridIndex::create(
            &dir.join(&config.index_filename),
            config.columns,
            config.rows,
            config.index_entry_layout,
        )?;
        let blobs = ChunkedBlobStore::open_or_create(
            &dir,
            config.max_blob_file_size_bytes,
            &config.blob_filename_template,
        )?;

        tracing::info!(
            "Created storage {} ({}x{})",
            dir.display(),
            config.columns,
            config.rows
        );

        Ok(Self {
            path: dir,
            config,
            state: Some(OpenStorage { index, blobs }),
        })
    }

    /// Open an existing storage directory
    ///
    /// The path is used as given (no suffix is applied). The format version
    /// is recorded but not enforced.
    pub fn open(path: &Path) -> Result<Self> {
        let config = StorageConfig::load(path)?;

        let index = BinaryGridIndex::open(
            &path.join(&config.index_filename),
            config.columns,
            config.rows,
            config.index_entry_layout,
        )?;
        let blobs = ChunkedBlobStore::open_or_create(
            path,
            config.max_blob_file_size_bytes,
            &config.blob_filename_template,
        )?;

        tracing::info!(
            "Opened storage {} ({}x{}, {} blob files)",
            path.display(),
            config.columns,
            config.rows,
            blobs.file_count()
        );

        Ok(Self {
            path: path.to_path_buf(),
            config,
            state: Some(OpenStorage { index, blobs }),
        })
    }

    /// Read the bytes of a tile
    ///
    /// Returns:
    /// - `Ok(bytes)`: tile present
    /// - `Err(AbsentTile)`: cell never written or cleared
    /// - `Err(OutOfRange)`: coordinate outside the grid
    pub fn get_tile(&mut self, col: u32, row: u32) -> Result<Vec<u8>> {
        let state = self.state_mut()?;

        let entry = state.index.get_entry(col, row)?;
        if entry.is_absent() {
            return Err(TuileError::AbsentTile { col, row });
        }

        tracing::trace!("Reading tile ({}, {}): {:?}", col, row, entry);
        state
            .blobs
            .read_chunk(entry.file_index, entry.offset, entry.size)
    }

    /// Store the bytes of a tile
    ///
    /// Steps:
    /// 1. Append the bytes as a new chunk
    /// 2. Point the cell's entry at the chunk
    ///
    /// The chunk previously referenced by the cell is orphaned, not reclaimed.
    /// Empty `bytes` leave the cell absent.
    pub fn set_tile(&mut self, col: u32, row: u32, bytes: &[u8]) -> Result<()> {
        // Bounds first, so an out-of-range write orphans no chunk
        self.state()?;
        self.check_bounds(col, row)?;
        let state = self.state_mut()?;

        let location = state.blobs.write_chunk(bytes)?;
        state.index.set_entry(col, row, location.into())?;

        Ok(())
    }

    /// Mark a cell absent without writing any chunk
    pub fn clear_tile(&mut self, col: u32, row: u32) -> Result<()> {
        self.state_mut()?
            .index
            .set_entry(col, row, IndexEntry::absent())
    }

    /// Raw index entry of a cell
    pub fn entry(&mut self, col: u32, row: u32) -> Result<IndexEntry> {
        self.state_mut()?.index.get_entry(col, row)
    }

    /// Whether a cell holds a tile
    pub fn contains_tile(&mut self, col: u32, row: u32) -> Result<bool> {
        Ok(!self.entry(col, row)?.is_absent())
    }

    /// Every `(col, row)` in row-major order
    pub fn coords(&self) -> Result<GridCoords> {
        Ok(self.state()?.index.coords())
    }

    /// Coordinates whose entry flags share a bit with `mask`
    pub fn coords_masked(&mut self, mask: u8) -> Result<MaskedCoords<'_>> {
        Ok(self.state_mut()?.index.coords_masked(mask))
    }

    /// Close the blob store and the index
    ///
    /// Both are closed even if the first fails; the first error is returned.
    pub fn close(&mut self) -> Result<()> {
        let OpenStorage { index, blobs } = self.state.take().ok_or(TuileError::UseAfterClose)?;

        let blobs_closed = blobs.close();
        let index_closed = index.close();

        tracing::info!("Closed storage {}", self.path.display());

        blobs_closed.and(index_closed)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Grid dimensions as `(columns, rows)`
    pub fn size(&self) -> (u32, u32) {
        (self.config.columns, self.config.rows)
    }

    /// Number of cells in the grid
    pub fn len(&self) -> u64 {
        self.config.cell_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Number of blob files currently in use
    pub fn blob_file_count(&self) -> Result<usize> {
        Ok(self.state()?.blobs.file_count())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn state(&self) -> Result<&OpenStorage> {
        self.state.as_ref().ok_or(TuileError::UseAfterClose)
    }

    fn state_mut(&mut self) -> Result<&mut OpenStorage> {
        self.state.as_mut().ok_or(TuileError::UseAfterClose)
    }

    fn check_bounds(&self, col: u32, row: u32) -> Result<()> {
        let (columns, rows) = self.size();
        if col >= columns || row >= rows {
            return Err(TuileError::OutOfRange {
                col,
                row,
                columns,
                rows,
            });
        }
        Ok(())
    }
}

impl Drop for TileStorage {
    fn drop(&mut self) {
        if self.state.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!("Failed to close storage {}: {}", self.path.display(), e);
            }
        }
    }
}
