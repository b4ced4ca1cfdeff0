//! Error types for the CI dashboard core
//!
//! Provides error handling for:
//! - Configuration loading and validation
//! - Test history resolution (listing and latest-build failures)
//! - GPU burn log export

use dash_artifact::{BuildIdError, FingerprintError};
use dash_fetch::FetchError;
use std::path::PathBuf;

/// Configuration errors
///
/// Always fatal: they abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file cannot be read
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration is not valid YAML for the matrix schema
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration parses but violates a rule
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A missing-page fingerprint cannot be parsed
    #[error("invalid missing-page fingerprint for {scope}: {source}")]
    Fingerprint {
        scope: String,
        #[source]
        source: FingerprintError,
    },
}

impl ConfigError {
    /// Create a validation error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Test history resolution errors
///
/// Only the failures that abort a run are represented; per-field problems
/// degrade to defaults and are logged.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The test's history directory cannot be listed
    #[error("failed to list the builds of {prow_name}: {source}")]
    Listing {
        prow_name: String,
        #[source]
        source: FetchError,
    },

    /// `latest-build.txt` cannot be fetched
    #[error("failed to fetch the latest build of {prow_name}: {source}")]
    LatestBuild {
        prow_name: String,
        #[source]
        source: FetchError,
    },

    /// `latest-build.txt` does not hold a build id
    #[error("invalid latest build id for {prow_name}: {source}")]
    InvalidBuildId {
        prow_name: String,
        #[source]
        source: BuildIdError,
    },

    /// Configuration problem discovered while resolving
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ResolveError {
    /// Prow job the error relates to, if any
    #[must_use]
    pub fn prow_name(&self) -> Option<&str> {
        match self {
            Self::Listing { prow_name, .. }
            | Self::LatestBuild { prow_name, .. }
            | Self::InvalidBuildId { prow_name, .. } => Some(prow_name),
            Self::Config(_) => None,
        }
    }
}

/// GPU burn log export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// An exported log cannot be written
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A matrix fetcher cannot be configured
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_error_names_the_job() {
        let err = ResolveError::Listing {
            prow_name: "periodic-ci-x-master-e2e".to_string(),
            source: FetchError::network("https://store/x/", "timed out"),
        };
        assert!(err.to_string().contains("periodic-ci-x-master-e2e"));
        assert_eq!(err.prow_name(), Some("periodic-ci-x-master-e2e"));
    }

    #[test]
    fn config_error_is_transparent() {
        let err: ResolveError = ConfigError::invalid("test_history must be positive").into();
        assert_eq!(err.to_string(), "invalid configuration: test_history must be positive");
        assert_eq!(err.prow_name(), None);
    }
}
