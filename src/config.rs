//! Configuration for Tuile
//!
//! Two kinds of configuration live here:
//! - [`StorageConfig`]: the record persisted once, at creation, as
//!   `info.json` inside every storage directory.
//! - [`ServerConfig`]: runtime settings of the tile server.
//!
//! ## Persisted Record
//! ```text
//! {
//!   "format_version": "1.0",
//!   "index_filename": "index",
//!   "blob_filename_template": "tiles{index:010d}",
//!   "max_blob_file_size_bytes": 4294967296,
//!   "columns": 128,
//!   "rows": 64,
//!   "index_entry_layout": ">HQIB"
//! }
//! ```
//! Key names written by older tooling (`version`, `tilesets_filename_format`,
//! `max_tilesets_size`, `index_entry_format`) are accepted on load.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TuileError};
use crate::index::ENTRY_SIZE;

/// Name of the metadata record inside a storage directory
pub const INFO_FILENAME: &str = "info.json";

/// Default maximum size of a single blob file (4 GiB)
pub const DEFAULT_MAX_BLOB_FILE_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Default index filename
pub const DEFAULT_INDEX_FILENAME: &str = "index";

/// Default blob filename template
pub const DEFAULT_BLOB_FILENAME_TEMPLATE: &str = "tiles{index:010d}";

const TEMPLATE_PLACEHOLDER: &str = "{index";

// =============================================================================
// Format Version
// =============================================================================

/// Storage format version recorded at creation
///
/// Only `1.0` is known. Other values are kept verbatim; no compatibility
/// policy is enforced on open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormatVersion {
    V1,
    Other(String),
}

impl FormatVersion {
    pub fn is_known(&self) -> bool {
        matches!(self, FormatVersion::V1)
    }
}

impl From<String> for FormatVersion {
    fn from(s: String) -> Self {
        match s.as_str() {
            "1.0" => FormatVersion::V1,
            _ => FormatVersion::Other(s),
        }
    }
}

impl From<FormatVersion> for String {
    fn from(v: FormatVersion) -> Self {
        v.to_string()
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatVersion::V1 => f.write_str("1.0"),
            FormatVersion::Other(s) => f.write_str(s),
        }
    }
}

// =============================================================================
// Entry Layout
// =============================================================================

/// Binary layout of one index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryLayout {
    /// Big-endian u16 file index, u64 offset, u32 size, u8 flags (15 bytes)
    #[serde(rename = ">HQIB")]
    BigEndianHQIB,
}

impl EntryLayout {
    /// Size in bytes of one record in this layout
    pub fn entry_size(&self) -> u64 {
        match self {
            EntryLayout::BigEndianHQIB => ENTRY_SIZE as u64,
        }
    }
}

// =============================================================================
// Storage Config
// =============================================================================

/// Configuration persisted in every storage directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(alias = "version")]
    pub format_version: FormatVersion,

    /// Index file name, relative to the storage directory
    pub index_filename: String,

    /// Blob file name template, e.g. `tiles{index:010d}`
    #[serde(alias = "tilesets_filename_format")]
    pub blob_filename_template: String,

    /// Size cap of each blob file
    #[serde(alias = "max_tilesets_size")]
    pub max_blob_file_size_bytes: u64,

    pub columns: u32,
    pub rows: u32,

    #[serde(alias = "index_entry_format")]
    pub index_entry_layout: EntryLayout,
}

impl StorageConfig {
    /// Default configuration for a grid of `columns x rows`
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            format_version: FormatVersion::V1,
            index_filename: DEFAULT_INDEX_FILENAME.to_string(),
            blob_filename_template: DEFAULT_BLOB_FILENAME_TEMPLATE.to_string(),
            max_blob_file_size_bytes: DEFAULT_MAX_BLOB_FILE_SIZE,
            columns,
            rows,
            index_entry_layout: EntryLayout::BigEndianHQIB,
        }
    }

    /// Create a new config builder
    pub fn builder(columns: u32, rows: u32) -> StorageConfigBuilder {
        StorageConfigBuilder {
            config: Self::new(columns, rows),
        }
    }

    /// Check every field for a usable value
    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 || self.rows == 0 {
            return Err(TuileError::Config(format!(
                "Grid dimensions must be non-zero, got {}x{}",
                self.columns, self.rows
            )));
        }
        if self.max_blob_file_size_bytes == 0 {
            return Err(TuileError::Config(
                "max_blob_file_size_bytes must be non-zero".to_string(),
            ));
        }
        if self.index_filename.is_empty() {
            return Err(TuileError::Config("index_filename is empty".to_string()));
        }
        let template = BlobTemplate::parse(&self.blob_filename_template)?;
        for name in [self.index_filename.as_str(), INFO_FILENAME] {
            if template.matches(name) {
                return Err(TuileError::Config(format!(
                    "{:?} collides with blob file names from template {:?}",
                    name, self.blob_filename_template
                )));
            }
        }
        Ok(())
    }

    /// Number of cells in the grid
    pub fn cell_count(&self) -> u64 {
        self.columns as u64 * self.rows as u64
    }

    /// Exact length of the index file
    pub fn index_len(&self) -> u64 {
        self.cell_count() * self.index_entry_layout.entry_size()
    }

    /// Read and validate the record from a storage directory
    pub fn load(storage_dir: &Path) -> Result<Self> {
        let raw = fs::read(storage_dir.join(INFO_FILENAME))?;
        let config: StorageConfig = serde_json::from_slice(&raw)?;
        config.validate()?;

        if !config.format_version.is_known() {
            tracing::warn!(
                "Storage {} has unrecognised format version {}",
                storage_dir.display(),
                config.format_version
            );
        }

        Ok(config)
    }

    /// Write the record into a storage directory
    pub fn save(&self, storage_dir: &Path) -> Result<()> {
        let raw = serde_json::to_vec_pretty(self)?;
        fs::write(storage_dir.join(INFO_FILENAME), raw)?;
        Ok(())
    }
}

/// Builder for StorageConfig
pub struct StorageConfigBuilder {
    config: StorageConfig,
}

impl StorageConfigBuilder {
    /// Set the blob file size cap (in bytes)
    pub fn max_blob_file_size(mut self, bytes: u64) -> Self {
        self.config.max_blob_file_size_bytes = bytes;
        self
    }

    /// Set the index file name
    pub fn index_filename(mut self, name: impl Into<String>) -> Self {
        self.config.index_filename = name.into();
        self
    }

    /// Set the blob file name template
    pub fn blob_filename_template(mut self, template: impl Into<String>) -> Self {
        self.config.blob_filename_template = template.into();
        self
    }

    pub fn build(self) -> StorageConfig {
        self.config
    }
}

// =============================================================================
// Blob Filename Templates
// =============================================================================

/// A parsed blob filename template: `<prefix>{index:0Nd}<suffix>`
struct BlobTemplate<'a> {
    prefix: &'a str,
    width: usize,
    suffix: &'a str,
}

impl<'a> BlobTemplate<'a> {
    fn parse(template: &'a str) -> Result<Self> {
        let malformed = || {
            TuileError::Config(format!(
                "Blob filename template {:?} needs an {{index}} or {{index:0Nd}} placeholder",
                template
            ))
        };

        let start = template.find(TEMPLATE_PLACEHOLDER).ok_or_else(malformed)?;
        let end = template[start..]
            .find('}')
            .map(|pos| start + pos)
            .ok_or_else(malformed)?;

        let format = &template[start + TEMPLATE_PLACEHOLDER.len()..end];
        let width = if format.is_empty() {
            0
        } else {
            let digits = format
                .strip_prefix(':')
                .and_then(|s| s.strip_suffix('d'))
                .ok_or_else(malformed)?;
            match digits {
                "" => 0,
                d if d.starts_with('0') => {
                    let width = &d[1..];
                    if width.is_empty() {
                        0
                    } else {
                        width.parse::<usize>().map_err(|_| malformed())?
                    }
                }
                _ => return Err(malformed()),
            }
        };

        Ok(Self {
            prefix: &template[..start],
            width,
            suffix: &template[end + 1..],
        })
    }

    fn render(&self, index: usize) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        )
    }

    /// Whether `name` has the shape of some rendered blob file name
    ///
    /// `tiles{index:010d}` matches `tiles0000000001` and `tiles123`, not `index`.
    fn matches(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix)
            .and_then(|rest| rest.strip_suffix(self.suffix))
            .map_or(false, |digits| {
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            })
    }
}

/// Render a blob file name for the given sequential index
///
/// Supported placeholders: `{index}` and zero-padded `{index:0Nd}`.
/// `tiles{index:010d}` with index 3 gives `tiles0000000003`.
pub fn render_blob_filename(template: &str, index: usize) -> Result<String> {
    Ok(BlobTemplate::parse(template)?.render(index))
}

// =============================================================================
// Server Config
// =============================================================================

/// Runtime configuration of the tile server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding `<dataset>/<zoom>.tuiles` storages
    pub base_dir: PathBuf,

    /// TCP listen address
    pub listen_addr: String,

    /// Max number of storages kept open at once
    pub cache_capacity: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./maps"),
            listen_addr: "127.0.0.1:8080".to_string(),
            cache_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the directory storages are resolved against
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_dir = path.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set how many storages stay open
    pub fn cache_capacity(mut self, capacity: u64) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
