//! Storage rebuild (compaction)
//!
//! Copies every live tile into a fresh storage with the same configuration.
//! Orphaned chunks are left behind with the source.

use std::path::Path;

use crate::engine::TileStorage;
use crate::error::Result;

use super::{ImageDecoder, TileDecoder};

#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildOptions {
    /// Skip tiles that fail to decode
    pub check: bool,
}

/// Outcome of a rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Tiles written to the new storage
    pub copied: u64,
    /// Tiles dropped because they failed to decode
    pub skipped: u64,
    /// Payload bytes written to the new storage
    pub bytes_copied: u64,
}

/// Rebuild the storage at `source_path` into `dest_path`
///
/// The storage suffix is applied to `dest_path`, which must not exist.
pub fn rebuild(source_path: &Path, dest_path: &Path, options: RebuildOptions) -> Result<RebuildReport> {
    let mut source = TileStorage::open(source_path)?;
    let report = rebuild_with(&mut source, dest_path, options, &ImageDecoder, || {})?;
    source.close()?;
    Ok(report)
}

/// Rebuild an open storage into `dest_path` with a custom decoder
///
/// `tick` is called once per cell.
pub fn rebuild_with<D, F>(
    source: &mut TileStorage,
    dest_path: &Path,
    options: RebuildOptions,
    decoder: &D,
    mut tick: F,
) -> Result<RebuildReport>
where
    D: TileDecoder + ?Sized,
    F: FnMut(),
{
    let mut dest = TileStorage::create_with_config(dest_path, source.config().clone())?;
    let mut report = RebuildReport::default();

    for (col, row) in source.coords()? {
        tick();

        if source.entry(col, row)?.is_absent() {
            continue;
        }

        let tile = source.get_tile(col, row)?;
        if options.check {
            if let Err(e) = decoder.decode(&tile) {
                tracing::debug!("Dropping tile ({}, {}): {}", col, row, e);
                report.skipped += 1;
                continue;
            }
        }

        dest.set_tile(col, row, &tile)?;
        report.copied += 1;
        report.bytes_copied += tile.len() as u64;
    }

    tracing::info!(
        "Rebuilt {} into {}: {} tiles copied, {} dropped",
        source.path().display(),
        dest.path().display(),
        report.copied,
        report.skipped
    );

    dest.close()?;
    Ok(report)
}
