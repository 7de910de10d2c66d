//! Directory import
//!
//! Builds a storage from loose tile files named `tile-<row>x<col>.<ext>`,
//! sizing the grid from the largest coordinates found.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::{StorageConfig, DEFAULT_MAX_BLOB_FILE_SIZE};
use crate::engine::TileStorage;
use crate::error::{Result, TuileError};

/// Pattern: `tile-<row>x<col>.<ext>`, e.g. `tile-0012x0034.jpeg`
fn tile_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^tile-(?P<row>\d+)x(?P<col>\d+)\.[A-Za-z0-9]+$")
            .expect("tile filename pattern is valid")
    })
}

/// Parse `(col, row)` from a tile file name
///
/// `tile-0003x0010.jpeg` → `Some((10, 3))`
pub fn parse_tile_filename(name: &str) -> Option<(u32, u32)> {
    let captures = tile_pattern().captures(name)?;
    let row = captures.name("row")?.as_str().parse().ok()?;
    let col = captures.name("col")?.as_str().parse().ok()?;
    Some((col, row))
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Size cap of each blob file in the new storage
    pub max_blob_file_size: u64,
}

impl ImportOptions {
    /// Options with the blob file size cap given in MiB
    pub fn with_max_blob_mb(mb: u64) -> Result<Self> {
        let max_blob_file_size = mb.checked_mul(1024 * 1024).ok_or_else(|| {
            TuileError::Config(format!("Blob file size of {} MB is too large", mb))
        })?;
        Ok(Self { max_blob_file_size })
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            max_blob_file_size: DEFAULT_MAX_BLOB_FILE_SIZE,
        }
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub columns: u32,
    pub rows: u32,
    /// Files stored as tiles
    pub imported: u64,
}

/// Import every tile file in `tiles_dir` into a new storage at `out_path`
pub fn import_dir(tiles_dir: &Path, out_path: &Path) -> Result<ImportReport> {
    import_dir_with(tiles_dir, out_path, ImportOptions::default(), |_| {})
}

/// Import with explicit options
///
/// `tick` receives the total number of files once before the first write,
/// then is called with `0` after every stored tile.
pub fn import_dir_with<F>(
    tiles_dir: &Path,
    out_path: &Path,
    options: ImportOptions,
    mut tick: F,
) -> Result<ImportReport>
where
    F: FnMut(u64),
{
    let tiles = scan_tiles(tiles_dir)?;
    if tiles.is_empty() {
        return Err(TuileError::Import(format!(
            "No tile files found in {}",
            tiles_dir.display()
        )));
    }

    let (columns, rows) = tiles
        .iter()
        .fold((0u32, 0u32), |(cols, rows), (col, row, _)| {
            (cols.max(col.saturating_add(1)), rows.max(row.saturating_add(1)))
        });

    let config = StorageConfig::builder(columns, rows)
        .max_blob_file_size(options.max_blob_file_size)
        .build();
    let mut storage = TileStorage::create_with_config(out_path, config)?;

    tick(tiles.len() as u64);
    for (col, row, path) in &tiles {
        let bytes = fs::read(path)?;
        storage.set_tile(*col, *row, &bytes)?;
        tick(0);
    }

    tracing::info!(
        "Imported {} tiles from {} into {} ({}x{})",
        tiles.len(),
        tiles_dir.display(),
        storage.path().display(),
        columns,
        rows
    );

    storage.close()?;

    Ok(ImportReport {
        columns,
        rows,
        imported: tiles.len() as u64,
    })
}

/// Collect `(col, row, path)` for every file, sorted row-major
fn scan_tiles(tiles_dir: &Path) -> Result<Vec<(u32, u32, PathBuf)>> {
    let mut tiles = Vec::new();

    for entry in fs::read_dir(tiles_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        let (col, row) = parse_tile_filename(&name).ok_or_else(|| {
            TuileError::Import(format!(
                "File name {:?} does not match tile-<row>x<col>.<ext>",
                name
            ))
        })?;
        tiles.push((col, row, path));
    }

    tiles.sort_by_key(|(col, row, _)| (*row, *col));
    Ok(tiles)
}
