//! CI Dashboard Artifact Fetching
//!
//! Cache-first access to a Prow artifact store.
//!
//! The store is a static, append-only file server that never answers 404: a
//! missing path comes back as a generic placeholder page. This crate hides
//! that behind a typed API:
//!
//! - [`ArtifactFetcher`]: disk cache in front of an [`Origin`]
//! - [`NotFoundDetector`]: recognises the placeholder page by fingerprint
//! - [`list_entries`]: scrapes directory listing pages
//! - [`parsers`]: JSON object, JSON array and HTML parsing
//!
//! # Example
//!
//! ```rust,no_run
//! use dash_fetch::{ArtifactFetcher, CachePolicy, EntryFilter};
//!
//! let fetcher = ArtifactFetcher::new("https://gcsweb.example/gcs/logs", "/tmp/ci-cache");
//! let builds = fetcher.list_directory(
//!     "periodic-ci-gpu-operator-master-e2e",
//!     EntryFilter::directories(),
//!     CachePolicy::Refresh,
//! )?;
//! for build in builds.iter().rev().take(5) {
//!     let finished = fetcher.fetch_json(&format!("periodic-ci-gpu-operator-master-e2e/{build}/finished.json"))?;
//!     println!("{build}: {:?}", finished.get("result"));
//! }
//! # Ok::<(), dash_fetch::FetchError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod cache;
pub mod error;
pub mod fetcher;
pub mod listing;
pub mod not_found;
pub mod origin;
pub mod parsers;

// Re-exports
pub use cache::DiskCache;
pub use error::{FetchError, FetchResult, ParseError};
pub use fetcher::{ArtifactFetcher, CachePolicy};
pub use listing::{entries, list_entries, EntryFilter, ListingEntry};
pub use not_found::NotFoundDetector;
pub use origin::{HttpOrigin, Origin};
pub use parsers::{ArtifactResult, HtmlDocument, JsonArray, JsonObject};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
