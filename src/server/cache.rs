//! Storage cache
//!
//! Keeps a bounded number of storages open, keyed by `(dataset, zoom)`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use moka::sync::Cache;
use parking_lot::Mutex;

use crate::engine::{storage_path, TileStorage};
use crate::error::Result;

/// An open storage shared between requests
pub type SharedStorage = Arc<Mutex<TileStorage>>;

/// Bounded cache of open storages
///
/// Evicted storages are closed once the last request holding them finishes.
/// Missing storages are not cached, so a storage created later is picked up
/// on the next request.
pub struct StorageCache {
    /// Directory holding `<dataset>/<zoom>.tuiles`
    base_dir: PathBuf,
    cache: Cache<(String, u32), SharedStorage>,
}

impl StorageCache {
    pub fn new(base_dir: &Path, capacity: u64) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            cache: Cache::new(capacity),
        }
    }

    /// Directory of the storage for `(dataset, zoom)`
    pub fn storage_dir(&self, dataset: &str, zoom: u32) -> PathBuf {
        storage_path(&self.base_dir.join(dataset).join(zoom.to_string()))
    }

    /// Get the storage for `(dataset, zoom)`, opening it on first use
    ///
    /// Returns:
    /// - `Ok(Some(storage))`: storage open
    /// - `Ok(None)`: no storage directory for this key
    pub fn get(&self, dataset: &str, zoom: u32) -> Result<Option<SharedStorage>> {
        let key = (dataset.to_string(), zoom);
        if let Some(storage) = self.cache.get(&key) {
            return Ok(Some(storage));
        }

        let dir = self.storage_dir(dataset, zoom);
        if !dir.is_dir() {
            return Ok(None);
        }

        // Concurrent first requests for one key share a single open
        let storage = self.cache.try_get_with(key, || -> Result<SharedStorage> {
            tracing::debug!("Opening storage {} for the cache", dir.display());
            Ok(Arc::new(Mutex::new(TileStorage::open(&dir)?)))
        })?;

        Ok(Some(storage))
    }

    /// Number of storages currently cached
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
