//! CI Dashboard Artifact Primitives
//!
//! Addressing and identification of Prow CI artifacts.
//!
//! # Core Concepts
//!
//! - [`ArtifactPath`]: path of an artifact relative to the store root, shared
//!   by the remote URL and the local cache mirror
//! - [`ArtifactKind`]: the representation a caller wants for fetched content
//! - [`BuildId`]: validated identifier of one CI build
//! - [`Fingerprint`]: stable digest used to recognise placeholder pages
//!
//! # Example
//!
//! ```rust
//! use dash_artifact::{ArtifactPath, BuildId};
//!
//! let job = ArtifactPath::directory("periodic-ci-gpu-operator-master-e2e")?;
//! let build = BuildId::new("1724391234567890944")?;
//! let finished = job.join_dir(build.as_str())?.join("finished.json")?;
//! assert!(finished.as_str().ends_with("/finished.json"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod artifact;
mod fingerprint;
mod path;

// Re-exports
pub use artifact::{ArtifactKind, BuildId, BuildIdError};
pub use fingerprint::{
    Fingerprint, FingerprintAlgorithm, FingerprintError, DEFAULT_MISSING_PAGE_FINGERPRINT,
};
pub use path::{ArtifactPath, PathError, DEFAULT_INDEX_FILENAME};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn build_path_from_job_and_build() {
        let job = ArtifactPath::directory("job").unwrap();
        let build = BuildId::new("17").unwrap();
        let path = job.join_dir(build.as_str()).unwrap().join("finished.json").unwrap();
        assert_eq!(path.as_str(), "job/17/finished.json");
        assert_eq!(path.parent_prefix(), "job/17/");
    }

    proptest! {
        #[test]
        fn prop_digit_strings_are_build_ids(id in "[0-9]{1,20}") {
            let build = BuildId::new(&id).unwrap();
            prop_assert_eq!(build.as_str(), id.as_str());
        }

        #[test]
        fn prop_fingerprint_roundtrips_through_hex(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            for algorithm in [FingerprintAlgorithm::Md5, FingerprintAlgorithm::Sha256] {
                let fp = Fingerprint::compute(algorithm, &data);
                let parsed: Fingerprint = fp.to_string().parse().unwrap();
                prop_assert_eq!(parsed, fp);
            }
        }
    }
}
