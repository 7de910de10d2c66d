//! Grid coordinate iterators
//!
//! Row-major traversal of every cell (column varies fastest).

use crate::error::Result;

use super::BinaryGridIndex;

/// Lazy, restartable sequence of every `(col, row)` in a grid
#[derive(Debug, Clone)]
pub struct GridCoords {
    columns: u32,
    /// Position of the next cell in row-major order
    position: u64,
    /// Total number of cells
    end: u64,
}

impl GridCoords {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            position: 0,
            end: columns as u64 * rows as u64,
        }
    }
}

impl Iterator for GridCoords {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.end {
            return None;
        }

        let columns = self.columns as u64;
        let col = (self.position % columns) as u32;
        let row = (self.position / columns) as u32;
        self.position += 1;

        Some((col, row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.position) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridCoords {}

/// Coordinates whose entry flags intersect a mask
///
/// Reads each entry from the index as it goes; I/O failures are yielded.
pub struct MaskedCoords<'a> {
    index: &'a mut BinaryGridIndex,
    coords: GridCoords,
    mask: u8,
}

impl<'a> MaskedCoords<'a> {
    pub(super) fn new(index: &'a mut BinaryGridIndex, mask: u8) -> Self {
        let coords = index.coords();
        Self {
            index,
            coords,
            mask,
        }
    }
}

impl<'a> Iterator for MaskedCoords<'a> {
    type Item = Result<(u32, u32)>;

    fn next(&mut self) -> Option<Self::Item> {
        for (col, row) in self.coords.by_ref() {
            match self.index.get_entry(col, row) {
                Ok(entry) if entry.flags & self.mask != 0 => return Some(Ok((col, row))),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
