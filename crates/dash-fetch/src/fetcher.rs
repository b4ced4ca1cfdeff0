//! Cache-first artifact fetcher
//!
//! One fetcher serves one artifact store: a base URL and the local cache root
//! mirroring it. Reads go to the cache first and fall back to the origin;
//! fresh content is written back unless it is the store's missing-page
//! placeholder.

use crate::cache::DiskCache;
use crate::error::{FetchError, FetchResult, ParseError};
use crate::listing::{list_entries, EntryFilter};
use crate::not_found::NotFoundDetector;
use crate::origin::{HttpOrigin, Origin};
use crate::parsers::{self, ArtifactResult, HtmlDocument, JsonArray, JsonObject};
use dash_artifact::{ArtifactKind, ArtifactPath};
use std::path::PathBuf;
use tracing::Span;

/// How a fetch treats an existing cache entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Return a cached entry without contacting the origin
    #[default]
    Trust,
    /// Always ask the origin, then overwrite the cache entry
    Refresh,
}

/// Fetches artifacts of one store through a disk cache
pub struct ArtifactFetcher<O: Origin = HttpOrigin> {
    origin: O,
    base_url: String,
    cache: DiskCache,
    detector: NotFoundDetector,
    span: Span,
}

impl ArtifactFetcher<HttpOrigin> {
    /// Create a fetcher over HTTP
    #[must_use]
    pub fn new(base_url: impl Into<String>, cache_root: impl Into<PathBuf>) -> Self {
        Self::with_origin(HttpOrigin::default(), base_url, DiskCache::new(cache_root))
    }
}

impl<O: Origin> ArtifactFetcher<O> {
    /// Create a fetcher over a custom origin
    pub fn with_origin(origin: O, base_url: impl Into<String>, cache: DiskCache) -> Self {
        let base_url = base_url.into();
        let span = tracing::debug_span!("fetcher", base_url = %base_url);
        Self {
            origin,
            base_url,
            cache,
            detector: NotFoundDetector::default(),
            span,
        }
    }

    /// Replace the missing-page detector
    #[must_use]
    pub fn with_detector(mut self, detector: NotFoundDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Replace the span log records are emitted in
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Artifact store base URL
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying disk cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Missing-page detector in use
    #[inline]
    #[must_use]
    pub fn detector(&self) -> &NotFoundDetector {
        &self.detector
    }

    /// Underlying origin
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &O {
        &self.origin
    }

    /// URL of an artifact path on the origin
    #[must_use]
    pub fn url(&self, path: &ArtifactPath) -> String {
        path.url(&self.base_url)
    }

    /// Fetch raw content, trusting the cache
    ///
    /// # Errors
    /// Returns error if the path is invalid, the origin fails, or the
    /// artifact is missing
    pub fn fetch(&self, path: &str) -> FetchResult<Vec<u8>> {
        self.fetch_with(path, CachePolicy::Trust)
    }

    /// Fetch raw content under an explicit cache policy
    ///
    /// # Errors
    /// Returns error if the path is invalid, the origin fails, or the
    /// artifact is missing
    pub fn fetch_with(&self, path: &str, policy: CachePolicy) -> FetchResult<Vec<u8>> {
        let _enter = self.span.enter();
        let path = ArtifactPath::new(path)?;
        let url = self.url(&path);

        if policy == CachePolicy::Trust {
            if let Some(content) = self.cache.read(&path) {
                if self.detector.is_not_found(&content, path.as_str()) {
                    tracing::debug!(%path, "cached placeholder page");
                    return Err(FetchError::NotFound { url });
                }
                tracing::debug!(%path, bytes = content.len(), "cache hit");
                return Ok(content);
            }
        }

        tracing::debug!(%url, ?policy, "fetching from origin");
        let content = self.origin.get(&url)?;

        if self.detector.is_not_found(&content, path.as_str()) {
            tracing::debug!(%url, "page doesn't exist");
            return Err(FetchError::NotFound { url });
        }

        if let Err(e) = self.cache.write(&path, &content) {
            tracing::warn!(%path, error = %e, "failed to write cache entry");
        }
        Ok(content)
    }

    /// Fetch and parse as `kind`
    ///
    /// # Errors
    /// Returns error if fetching fails or the content does not parse; a
    /// parse failure evicts the cache entry
    pub fn fetch_kind(
        &self,
        path: &str,
        kind: ArtifactKind,
        policy: CachePolicy,
    ) -> FetchResult<ArtifactResult> {
        self.fetch_parsed(path, kind, policy, |content| parsers::parse(kind, content))
    }

    /// Fetch a JSON object
    ///
    /// # Errors
    /// Returns error if fetching fails or the content is not a JSON object
    pub fn fetch_json(&self, path: &str) -> FetchResult<JsonObject> {
        self.fetch_parsed(path, ArtifactKind::Json, CachePolicy::Trust, |content| {
            parsers::json::parse_object(&content)
        })
    }

    /// Fetch a JSON array
    ///
    /// # Errors
    /// Returns error if fetching fails or the content is not a JSON array
    pub fn fetch_json_array(&self, path: &str) -> FetchResult<JsonArray> {
        self.fetch_parsed(path, ArtifactKind::JsonArray, CachePolicy::Trust, |content| {
            parsers::json::parse_array(&content)
        })
    }

    /// Fetch an HTML document
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    /// Returns error if fetching fails
    pub fn fetch_html(&self, path: &str, policy: CachePolicy) -> FetchResult<HtmlDocument> {
        let content = self.fetch_with(path, policy)?;
        Ok(HtmlDocument::parse(&content))
    }

    /// Fetch a text artifact with surrounding whitespace trimmed
    ///
    /// # Errors
    /// Returns error if fetching fails or the content is not UTF-8
    pub fn fetch_text(&self, path: &str, policy: CachePolicy) -> FetchResult<String> {
        self.fetch_parsed(path, ArtifactKind::Bytes, policy, |content| {
            String::from_utf8(content)
                .map(|text| text.trim().to_string())
                .map_err(|e| ParseError::NotUtf8(e.utf8_error()))
        })
    }

    /// List a directory
    ///
    /// `path` may be given with or without its trailing `/`.
    ///
    /// # Errors
    /// Returns error if the listing page cannot be fetched or parsed
    pub fn list_directory(
        &self,
        path: &str,
        filter: EntryFilter,
        policy: CachePolicy,
    ) -> FetchResult<Vec<String>> {
        let dir = ArtifactPath::directory(path)?;
        let document = self.fetch_html(dir.as_str(), policy)?;
        Ok(list_entries(&document, filter))
    }

    /// Remove a cache entry
    ///
    /// Returns whether an entry was removed.
    ///
    /// # Errors
    /// Returns error if the path is invalid
    pub fn evict(&self, path: &str) -> FetchResult<bool> {
        let _enter = self.span.enter();
        let path = ArtifactPath::new(path)?;
        match self.cache.evict(&path) {
            Ok(removed) => {
                if removed {
                    tracing::debug!(%path, "evicted cache entry");
                }
                Ok(removed)
            }
            Err(e) => {
                tracing::warn!(%path, error = %e, "failed to evict cache entry");
                Ok(false)
            }
        }
    }

    fn fetch_parsed<T, F>(
        &self,
        path: &str,
        kind: ArtifactKind,
        policy: CachePolicy,
        parse: F,
    ) -> FetchResult<T>
    where
        F: FnOnce(Vec<u8>) -> Result<T, ParseError>,
    {
        let content = self.fetch_with(path, policy)?;
        parse(content).map_err(|source| {
            let _enter = self.span.enter();
            tracing::warn!(path, %kind, error = %source, "unparsable artifact, evicting");
            let _ = self.evict(path);
            FetchError::parse(path, kind, source)
        })
    }
}

impl<O: Origin> std::fmt::Debug for ArtifactFetcher<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactFetcher")
            .field("base_url", &self.base_url)
            .field("cache", &self.cache)
            .field("detector", &self.detector)
            .finish_non_exhaustive()
    }
}
