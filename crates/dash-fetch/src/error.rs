//! Error types for artifact fetching
//!
//! Provides error handling for:
//! - Origin failures (unreachable, non-success status, unreadable body)
//! - Missing artifacts (placeholder pages recognised by fingerprint)
//! - Parse failures of typed artifacts

use dash_artifact::{ArtifactKind, PathError};
use std::fmt::Display;

/// Errors while turning fetched bytes into a typed artifact
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Malformed JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed JSON of the wrong shape
    #[error("expected a JSON {expected}, got {actual}")]
    UnexpectedShape {
        expected: &'static str,
        actual: &'static str,
    },

    /// Content is not valid UTF-8
    #[error("content is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
}

/// Errors during artifact fetching
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Origin unreachable, timed out, or answered with a non-success status
    #[error("error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// The origin served its missing-page placeholder
    #[error("page doesn't exist: {url}")]
    NotFound { url: String },

    /// Content could not be parsed as the requested kind
    #[error("error parsing {path} as {kind}: {source}")]
    Parse {
        path: String,
        kind: ArtifactKind,
        #[source]
        source: ParseError,
    },

    /// The requested path is not a valid artifact path
    #[error("invalid artifact path: {0}")]
    InvalidPath(#[from] PathError),
}

impl FetchError {
    /// Create network error for a URL
    pub fn network(url: impl Into<String>, message: impl Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create parse error for a path
    pub fn parse(path: impl Into<String>, kind: ArtifactKind, source: ParseError) -> Self {
        Self::Parse {
            path: path.into(),
            kind,
            source,
        }
    }

    /// Check if the artifact is genuinely missing
    ///
    /// Missing artifacts are an expected outcome and are never worth a
    /// warning.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_error_display() {
        let err = FetchError::network("https://example.com/a", "connection refused");
        assert_eq!(
            err.to_string(),
            "error fetching https://example.com/a: connection refused"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_is_distinguished() {
        let err = FetchError::NotFound {
            url: "https://example.com/a".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "page doesn't exist: https://example.com/a");
    }

    #[test]
    fn parse_error_mentions_kind() {
        let source = ParseError::UnexpectedShape {
            expected: "object",
            actual: "array",
        };
        let err = FetchError::parse("job/1/finished.json", ArtifactKind::Json, source);
        assert!(err.to_string().contains("type:json"));
        assert!(err.to_string().contains("job/1/finished.json"));
    }

    #[test]
    fn path_error_converts() {
        let err: FetchError = PathError::Empty.into();
        assert!(matches!(err, FetchError::InvalidPath(PathError::Empty)));
    }
}
