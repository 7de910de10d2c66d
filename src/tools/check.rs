//! Tile checker
//!
//! Walks every cell, decodes present tiles and reports what it found.

use crate::engine::TileStorage;
use crate::error::Result;

use super::{ImageDecoder, TileDecoder};

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Report invalid tiles without clearing them
    pub pretend: bool,
}

/// Outcome of a check run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Cells in the grid
    pub total: u64,
    /// Cells that were already absent
    pub empty: u64,
    /// Present tiles that failed to read or decode
    pub invalid: u64,
    /// Invalid tiles cleared (0 when pretending)
    pub cleared: u64,
}

impl CheckReport {
    /// Share of cells that are empty or invalid
    pub fn empty_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.invalid + self.empty) as f64 / self.total as f64
    }
}

/// Check every tile with the image decoder
pub fn check(storage: &mut TileStorage, options: CheckOptions) -> Result<CheckReport> {
    check_with(storage, options, &ImageDecoder, || {})
}

/// Check every tile with a custom decoder
///
/// `tick` is called once per cell. Index failures abort the run; a tile that
/// cannot be read or decoded is counted invalid and, unless pretending,
/// cleared.
pub fn check_with<D, F>(
    storage: &mut TileStorage,
    options: CheckOptions,
    decoder: &D,
    mut tick: F,
) -> Result<CheckReport>
where
    D: TileDecoder + ?Sized,
    F: FnMut(),
{
    let mut report = CheckReport {
        total: storage.len(),
        ..CheckReport::default()
    };

    for (col, row) in storage.coords()? {
        if storage.entry(col, row)?.is_absent() {
            report.empty += 1;
        } else {
            let outcome = storage
                .get_tile(col, row)
                .and_then(|bytes| decoder.decode(&bytes));

            if let Err(e) = outcome {
                tracing::warn!("Invalid tile ({}, {}): {}", col, row, e);
                report.invalid += 1;

                if !options.pretend {
                    storage.clear_tile(col, row)?;
                    report.cleared += 1;
                }
            }
        }
        tick();
    }

    tracing::info!(
        "Checked {}: {} invalid, {} empty of {} tiles",
        storage.path().display(),
        report.invalid,
        report.empty,
        report.total
    );

    Ok(report)
}
