//! Flat-file artifact cache
//!
//! Mirrors the remote store's path structure under a cache root. The store is
//! append-only, so a cached entry is trusted forever: there is no TTL, no
//! revalidation and no eviction policy.

use dash_artifact::{ArtifactPath, DEFAULT_INDEX_FILENAME};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// On-disk mirror of an artifact store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskCache {
    root: PathBuf,
    index_filename: String,
}

impl DiskCache {
    /// Create a cache rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_filename: DEFAULT_INDEX_FILENAME.to_string(),
        }
    }

    /// Override the filename under which listing pages are stored
    #[inline]
    #[must_use]
    pub fn with_index_filename(mut self, index_filename: impl Into<String>) -> Self {
        self.index_filename = index_filename.into();
        self
    }

    /// Cache root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filename under which listing pages are stored
    #[inline]
    #[must_use]
    pub fn index_filename(&self) -> &str {
        &self.index_filename
    }

    /// On-disk location of an artifact
    #[inline]
    #[must_use]
    pub fn location(&self, path: &ArtifactPath) -> PathBuf {
        path.cache_location(&self.root, &self.index_filename)
    }

    /// Check if an artifact is cached
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &ArtifactPath) -> bool {
        self.location(path).is_file()
    }

    /// Read a cached artifact
    ///
    /// Any read failure counts as a miss.
    #[must_use]
    pub fn read(&self, path: &ArtifactPath) -> Option<Vec<u8>> {
        let location = self.location(path);
        match fs::read(&location) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::debug!(location = %location.display(), error = %e, "unreadable cache entry, treating as a miss");
                None
            }
        }
    }

    /// Store an artifact verbatim, creating parent directories
    ///
    /// # Errors
    /// Returns error if a directory cannot be created or the file written
    pub fn write(&self, path: &ArtifactPath, content: &[u8]) -> io::Result<PathBuf> {
        let location = self.location(path);
        if let Some(parent) = location.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&location, content)?;
        Ok(location)
    }

    /// Remove a cached artifact
    ///
    /// Returns whether an entry was removed; a missing entry is not an error.
    ///
    /// # Errors
    /// Returns error if the entry exists but cannot be removed
    pub fn evict(&self, path: &ArtifactPath) -> io::Result<bool> {
        match fs::remove_file(self.location(path)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> ArtifactPath {
        ArtifactPath::new(p).unwrap()
    }

    #[test]
    fn miss_on_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        assert!(cache.read(&path("job/1/finished.json")).is_none());
        assert!(!cache.contains(&path("job/1/finished.json")));
    }

    #[test]
    fn write_then_read_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let content = b"{\"passed\": true}\n\x00\xff";

        let location = cache.write(&path("job/1/finished.json"), content).unwrap();
        assert!(location.starts_with(dir.path()));
        assert_eq!(cache.read(&path("job/1/finished.json")).unwrap(), content);
    }

    #[test]
    fn listing_pages_use_index_filename() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).with_index_filename("_listing.html");

        let location = cache.write(&path("job/"), b"<html></html>").unwrap();
        assert_eq!(location, dir.path().join("job").join("_listing.html"));
        assert!(cache.contains(&path("job/")));
    }

    #[test]
    fn evict_removes_entry_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());

        cache.write(&path("job/latest-build.txt"), b"42").unwrap();
        assert!(cache.evict(&path("job/latest-build.txt")).unwrap());
        assert!(!cache.evict(&path("job/latest-build.txt")).unwrap());
        assert!(cache.read(&path("job/latest-build.txt")).is_none());
    }

    #[test]
    fn default_index_filename() {
        let cache = DiskCache::new("/tmp/cache");
        assert_eq!(cache.index_filename(), DEFAULT_INDEX_FILENAME);
        assert_eq!(cache.root(), Path::new("/tmp/cache"));
    }
}
