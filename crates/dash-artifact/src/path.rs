//! Relative artifact paths
//!
//! Provides [`ArtifactPath`], a path relative to the root of an artifact
//! store. The same path addresses the remote artifact and its mirror in the
//! local cache.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Sentinel filename under which a directory listing page is cached.
///
/// `?` never appears unescaped in a URL path, so the sentinel cannot collide
/// with a real artifact name.
pub const DEFAULT_INDEX_FILENAME: &str = "?index";

/// Path of an artifact relative to the store root
///
/// Segments are separated by `/`. A trailing `/` marks a directory, whose
/// content is the listing page served by the store.
///
/// # Examples
/// - `job-name/` → listing of the job's builds
/// - `job-name/1234/finished.json` → a file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactPath(String);

impl ArtifactPath {
    /// Create a path, validating its segments
    ///
    /// # Errors
    /// Returns error if the path is empty, absolute, or contains empty,
    /// `.` or `..` segments
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if path.starts_with('/') {
            return Err(PathError::Absolute(path));
        }

        let body = path.strip_suffix('/').unwrap_or(&path);
        for segment in body.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(PathError::InvalidSegment {
                    path: path.clone(),
                    segment: segment.to_string(),
                });
            }
        }

        Ok(Self(path))
    }

    /// Path of a directory (its listing page)
    ///
    /// # Errors
    /// Returns error if the directory name is not a valid path
    pub fn directory(name: &str) -> Result<Self, PathError> {
        let name = name.trim_end_matches('/');
        Self::new(format!("{name}/"))
    }

    /// Path as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this path addresses a directory listing
    #[inline]
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.0.ends_with('/')
    }

    /// Everything up to and including the last `/`
    ///
    /// For a directory this is the directory itself; for a top-level file it
    /// is empty.
    #[inline]
    #[must_use]
    pub fn parent_prefix(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) => &self.0[..=pos],
            None => "",
        }
    }

    /// Last non-empty segment
    #[must_use]
    pub fn file_name(&self) -> &str {
        let body = self.0.strip_suffix('/').unwrap_or(&self.0);
        body.rsplit('/').next().unwrap_or(body)
    }

    /// Append a file segment, returning a new path
    ///
    /// `segment` may itself contain `/`-separated segments; a trailing `/`
    /// yields a directory path.
    ///
    /// # Errors
    /// Returns error if the resulting path is invalid
    pub fn join(&self, segment: &str) -> Result<Self, PathError> {
        let base = self.0.trim_end_matches('/');
        Self::new(format!("{base}/{segment}"))
    }

    /// Append a directory segment, returning a directory path
    ///
    /// # Errors
    /// Returns error if the resulting path is invalid
    pub fn join_dir(&self, segment: &str) -> Result<Self, PathError> {
        let segment = segment.trim_end_matches('/');
        self.join(&format!("{segment}/"))
    }

    /// Location of this artifact inside a cache root
    ///
    /// Directory paths get `index_filename` appended so the listing page is
    /// stored as a regular file inside the directory it represents.
    #[must_use]
    pub fn cache_location(&self, cache_root: &Path, index_filename: &str) -> PathBuf {
        let mut location = cache_root.to_path_buf();
        for segment in self.0.split('/').filter(|s| !s.is_empty()) {
            location.push(segment);
        }
        if self.is_directory() {
            location.push(index_filename);
        }
        location
    }

    /// URL of this artifact below a base URL
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl Display for ArtifactPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ArtifactPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ArtifactPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors related to artifact paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty path
    #[error("empty artifact path")]
    Empty,

    /// Path starts at the filesystem root
    #[error("artifact path must be relative: '{0}'")]
    Absolute(String),

    /// Empty, `.` or `..` segment
    #[error("invalid segment '{segment}' in artifact path '{path}'")]
    InvalidSegment { path: String, segment: String },
}
