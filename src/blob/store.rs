//! Chunked Blob Store
//!
//! Manages the numbered blob files and the write cursor of the active one.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::render_blob_filename;
use crate::error::{Result, TuileError};

use super::ChunkLocation;

/// Highest number of blob files addressable by a 16-bit file index
const MAX_FILE_COUNT: usize = u16::MAX as usize + 1;

/// Append-only, size-sharded chunk storage
///
/// ## Mutability:
/// - `sealed`: files below the active one, opened read-only
/// - `active`: the last file, opened read-write, written at `cursor`
///
/// Single writer only; no file locking is performed.
pub struct ChunkedBlobStore {
    /// Directory holding the blob files
    dir: PathBuf,

    /// Filename template, e.g. `tiles{index:010d}`
    template: String,

    /// Size cap of each file
    max_file_size: u64,

    /// Read-only handles, indexed by file number
    sealed: Vec<File>,

    /// Read-write handle of file number `sealed.len()`
    active: File,

    /// Next write position in the active file
    cursor: u64,
}

impl ChunkedBlobStore {
    /// Open existing blob files in `dir`, or create file 0
    ///
    /// On startup:
    /// 1. Probe files 0, 1, 2, ... until one is missing
    /// 2. Open all but the last read-only
    /// 3. Reopen the last read-write with the cursor at its end
    pub fn open_or_create(dir: &Path, max_file_size: u64, template: &str) -> Result<Self> {
        let mut sealed = Vec::new();
        loop {
            let path = Self::file_path_with_dir(dir, template, sealed.len())?;
            if !path.exists() || sealed.len() == MAX_FILE_COUNT {
                break;
            }
            sealed.push(File::open(&path)?);
        }

        let (active, cursor) = match sealed.pop() {
            Some(last) => {
                drop(last);
                let path = Self::file_path_with_dir(dir, template, sealed.len())?;
                let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
                let cursor = file.seek(SeekFrom::End(0))?;
                (file, cursor)
            }
            None => {
                let path = Self::file_path_with_dir(dir, template, 0)?;
                (Self::create_file(&path)?, 0)
            }
        };

        tracing::debug!(
            "Opened blob store {}: {} files, cursor at {}",
            dir.display(),
            sealed.len() + 1,
            cursor
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            template: template.to_string(),
            max_file_size,
            sealed,
            active,
            cursor,
        })
    }

    /// Append a chunk and return where it was stored
    ///
    /// Rotates to a new file first if the chunk would cross the size cap.
    /// A chunk never spans two files.
    pub fn write_chunk(&mut self, bytes: &[u8]) -> Result<ChunkLocation> {
        let size = bytes.len() as u64;
        if size >= self.max_file_size || size > u32::MAX as u64 {
            return Err(TuileError::ChunkTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        if self.cursor + size > self.max_file_size {
            self.rotate()?;
        }

        self.active.seek(SeekFrom::Start(self.cursor))?;
        self.active.write_all(bytes)?;

        let location = ChunkLocation {
            file_index: self.active_index() as u16,
            offset: self.cursor,
            size: size as u32,
        };
        self.cursor += size;

        tracing::trace!(
            "Wrote chunk of {} bytes at file {} offset {}",
            size,
            location.file_index,
            location.offset
        );

        Ok(location)
    }

    /// Read exactly `size` bytes at `offset` in file `file_index`
    pub fn read_chunk(&mut self, file_index: u16, offset: u64, size: u32) -> Result<Vec<u8>> {
        let file_count = self.file_count();
        let index = file_index as usize;
        let file = if index < self.sealed.len() {
            &mut self.sealed[index]
        } else if index == self.sealed.len() {
            &mut self.active
        } else {
            return Err(TuileError::BlobFileMissing {
                file_index,
                file_count,
            });
        };

        // A corrupt entry must not drive a huge allocation
        let file_len = file.metadata()?.len();
        let end = offset.checked_add(size as u64);
        if end.map_or(true, |end| end > file_len) {
            return Err(TuileError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Chunk at file {} offset {} size {} ends past file length {}",
                    file_index, offset, size, file_len
                ),
            )));
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut chunk = vec![0u8; size as usize];
        file.read_exact(&mut chunk)?;

        Ok(chunk)
    }

    /// Number of blob files (sealed + active)
    pub fn file_count(&self) -> usize {
        self.sealed.len() + 1
    }

    /// Write position in the active file
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Path of blob file number `index`
    pub fn file_path(&self, index: usize) -> Result<PathBuf> {
        Self::file_path_with_dir(&self.dir, &self.template, index)
    }

    /// Sync the active file and release every handle
    pub fn close(self) -> Result<()> {
        self.active.sync_all()?;
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// File number of the active file
    fn active_index(&self) -> usize {
        self.sealed.len()
    }

    /// Seal the active file and start the next one
    fn rotate(&mut self) -> Result<()> {
        let next = self.active_index() + 1;
        if next >= MAX_FILE_COUNT {
            return Err(TuileError::BlobFileLimit(MAX_FILE_COUNT));
        }

        self.active.sync_all()?;
        let sealed = File::open(self.file_path(self.active_index())?)?;
        let fresh = Self::create_file(&self.file_path(next)?)?;

        // Dropping the old read-write handle demotes the file to read-only
        self.active = fresh;
        self.sealed.push(sealed);
        self.cursor = 0;

        tracing::debug!("Rotated blob store {} to file {}", self.dir.display(), next);

        Ok(())
    }

    /// Create (or truncate) a blob file for reading and writing
    fn create_file(path: &Path) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(file)
    }

    /// Blob file path given a directory, template and file number
    fn file_path_with_dir(dir: &Path, template: &str, index: usize) -> Result<PathBuf> {
        Ok(dir.join(render_blob_filename(template, index)?))
    }
}
