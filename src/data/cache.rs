//! Memoized dataset loading.
//!
//! A [`DatasetLoader`] keeps one [`CanonicalDataset`] per source path,
//! tagged with the file's [`SourceSignature`]. A later `load` of the same
//! path returns the cached `Arc` while the signature is unchanged and
//! rebuilds when the file has been modified.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use log::debug;

use super::loader::load_dataset;
use super::model::CanonicalDataset;
use crate::config::PipelineConfig;
use crate::error::DataSourceError;

/// Identity of a source file's contents as seen by the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSignature {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceSignature {
    pub fn of(path: &Path) -> Result<Self, DataSourceError> {
        let io_err = |source: io::Error| {
            if source.kind() == io::ErrorKind::NotFound {
                DataSourceError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                DataSourceError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        };
        let canonical = std::fs::canonicalize(path).map_err(io_err)?;
        let meta = std::fs::metadata(&canonical).map_err(io_err)?;
        Ok(SourceSignature {
            path: canonical,
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

struct CacheEntry {
    signature: SourceSignature,
    dataset: Arc<CanonicalDataset>,
    /// Paths callers used for this source, for lookups once the file is gone.
    requested: Vec<PathBuf>,
}

/// Loads listings files and memoizes the canonical dataset per source.
pub struct DatasetLoader {
    config: PipelineConfig,
    cache: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl DatasetLoader {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // Entries are immutable `Arc`s, so a poisoned lock still guards
    // consistent data.
    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load `path`, reusing the cached dataset while the file is unchanged.
    ///
    /// The lock is held across lookup and rebuild so concurrent callers for
    /// one signature always observe the same dataset.
    pub fn load(&self, path: &Path) -> Result<Arc<CanonicalDataset>, DataSourceError> {
        let signature = SourceSignature::of(path)?;
        let mut entries = self.entries();

        if let Some(entry) = entries.get_mut(&signature.path) {
            if entry.signature == signature {
                debug!("dataset cache hit for {}", signature.path.display());
                if !entry.requested.iter().any(|p| p == path) {
                    entry.requested.push(path.to_path_buf());
                }
                return Ok(Arc::clone(&entry.dataset));
            }
            debug!(
                "source changed, rebuilding dataset for {}",
                signature.path.display()
            );
        } else {
            debug!("dataset cache miss for {}", signature.path.display());
        }

        let dataset = Arc::new(load_dataset(&signature.path, &self.config)?);
        entries.insert(
            signature.path.clone(),
            CacheEntry {
                signature,
                dataset: Arc::clone(&dataset),
                requested: vec![path.to_path_buf()],
            },
        );
        Ok(dataset)
    }

    /// Drop the cached dataset for `path`. Returns whether one was cached.
    pub fn invalidate(&self, path: &Path) -> bool {
        let mut entries = self.entries();
        let Some(key) = cache_key(&entries, path) else {
            return false;
        };
        let removed = entries.remove(&key).is_some();
        if removed {
            debug!("invalidated cached dataset for {}", key.display());
        }
        removed
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        let entries = self.entries();
        cache_key(&entries, path).is_some_and(|key| entries.contains_key(&key))
    }
}

/// Canonical key for `path`. When the file can no longer be resolved, fall
/// back to the entry that was loaded through the same path.
fn cache_key(entries: &HashMap<PathBuf, CacheEntry>, path: &Path) -> Option<PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(canonical) => Some(canonical),
        Err(_) => entries
            .iter()
            .find(|(_, entry)| entry.requested.iter().any(|p| p == path))
            .map(|(key, _)| key.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "name,neighbourhood,room_type,latitude,longitude,price,number_of_reviews\n";

    fn write_listings(path: &Path, rows: usize) {
        let mut text = String::from(HEADER);
        for i in 0..rows {
            text.push_str(&format!(
                "flat {i},Roma Norte,Entire home/apt,19.41,-99.16,\"${},000\",{i}\n",
                i + 1
            ));
        }
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn repeated_load_returns_same_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        write_listings(&path, 20);

        let loader = DatasetLoader::default();
        let first = loader.load(&path).unwrap();
        let second = loader.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(loader.is_cached(&path));
    }

    #[test]
    fn changed_file_rebuilds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        write_listings(&path, 20);

        let loader = DatasetLoader::default();
        let first = loader.load(&path).unwrap();
        write_listings(&path, 40);
        let second = loader.load(&path).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.report().rows_in, 20);
        assert_eq!(second.report().rows_in, 40);
    }

    #[test]
    fn explicit_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        write_listings(&path, 10);

        let loader = DatasetLoader::default();
        let first = loader.load(&path).unwrap();
        assert!(loader.invalidate(&path));
        assert!(!loader.invalidate(&path));
        let second = loader.load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        loader.clear();
        assert!(!loader.is_cached(&path));
    }

    #[test]
    fn invalidate_after_file_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        write_listings(&path, 10);
        // Not the canonical form of `path`.
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let indirect = dir.path().join("sub").join("..").join("listings.csv");

        let loader = DatasetLoader::default();
        loader.load(&indirect).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(loader.is_cached(&indirect));
        assert!(loader.invalidate(&indirect));
        assert!(!loader.is_cached(&indirect));
        assert!(!loader.invalidate(&indirect));
    }

    #[test]
    fn missing_file_is_a_data_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DatasetLoader::default();
        let err = loader.load(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, DataSourceError::NotFound { .. }));
    }
}
