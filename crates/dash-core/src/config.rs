//! Matrix configuration loading
//!
//! The configuration is a YAML file read once at startup, from a path or
//! from stdin when the path is `-`. Unknown keys are ignored.

use crate::error::ConfigError;
use crate::types::{MatricesSpec, MatrixSpec};
use dash_artifact::Fingerprint;
use std::io::Read;
use std::path::Path;

/// Path meaning "read the configuration from stdin"
pub const STDIN_PATH: &str = "-";

/// Load and validate a configuration file
///
/// # Errors
/// Returns error if the file cannot be read, is not valid YAML, or fails
/// validation
pub fn load(path: impl AsRef<Path>) -> Result<MatricesSpec, ConfigError> {
    let path = path.as_ref();
    let content = if path == Path::new(STDIN_PATH) {
        tracing::debug!("reading configuration from stdin");
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        buf
    } else {
        tracing::debug!(path = %path.display(), "reading configuration");
        std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?
    };
    parse(&content)
}

/// Parse and validate configuration text
///
/// # Errors
/// Returns error if the text is not valid YAML or fails validation
pub fn parse(yaml: &str) -> Result<MatricesSpec, ConfigError> {
    let mut spec: MatricesSpec = serde_yaml::from_str(yaml)?;
    for (name, matrix) in &mut spec.matrices {
        matrix.name.clone_from(name);
    }
    spec.validate()?;
    Ok(spec)
}

impl MatricesSpec {
    /// Check the configuration rules
    ///
    /// Every matrix needs an artifact URL and a cache directory, history
    /// depths must be positive, and fingerprints must parse.
    ///
    /// # Errors
    /// Returns the first violated rule
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.test_history == 0 {
            return Err(ConfigError::invalid("test_history must be positive"));
        }
        self.global_fingerprint()?;

        for (name, matrix) in &self.matrices {
            if matrix.artifacts_url.trim().is_empty() {
                return Err(ConfigError::invalid(format!("matrix {name}: artifacts_url is empty")));
            }
            if matrix.artifacts_cache.as_os_str().is_empty() {
                return Err(ConfigError::invalid(format!("matrix {name}: artifacts_cache is empty")));
            }
            if matrix.index_filename.is_empty() || matrix.index_filename.contains('/') {
                return Err(ConfigError::invalid(format!(
                    "matrix {name}: index_filename must be a plain file name"
                )));
            }
            if matrix.test_history == Some(0) {
                return Err(ConfigError::invalid(format!("matrix {name}: test_history must be positive")));
            }
            self.fingerprint_for(matrix)?;
        }
        Ok(())
    }

    /// Missing-page fingerprint of a matrix
    ///
    /// The matrix override wins over the global value, which wins over the
    /// built-in constant.
    ///
    /// # Errors
    /// Returns error if the applicable value is not a valid fingerprint
    pub fn fingerprint_for(&self, matrix: &MatrixSpec) -> Result<Fingerprint, ConfigError> {
        match matrix.missing_page_fingerprint.as_deref() {
            Some(hex) => hex.parse().map_err(|source| ConfigError::Fingerprint {
                scope: format!("matrix {}", matrix.name),
                source,
            }),
            None => self.global_fingerprint(),
        }
    }

    fn global_fingerprint(&self) -> Result<Fingerprint, ConfigError> {
        match self.missing_page_fingerprint.as_deref() {
            Some(hex) => hex.parse().map_err(|source| ConfigError::Fingerprint {
                scope: "configuration".to_string(),
                source,
            }),
            None => Ok(Fingerprint::default_missing_page()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_artifact::FingerprintAlgorithm;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const CONFIG: &str = r#"
version: v1
description: GPU Operator daily matrix
test_history: 3
matrices:
  gpu-operator:
    description: GPU Operator on OpenShift
    artifacts_url: https://gcsweb.example/gcs/origin-ci-test/logs
    artifacts_cache: /tmp/ci-cache/gpu-operator
    viewer_url: https://prow.example/view/gs/origin-ci-test/logs
    prow_config: periodic-ci-openshift-psap-ci-artifacts
    prow_step: gpu-operator-e2e
    operator_name: gpu-operator
    tests:
      "OCP 4.15|Master":
        - test_name: gpu-operator-e2e-master
          branch: release-4.15
          variant: nightly
      "OCP 4.14|Master":
        - test_name: gpu-operator-e2e-master
          branch: release-4.14
          prow_step: nightly-step
  nfd:
    artifacts_url: https://gcsweb.example/gcs/logs
    artifacts_cache: /tmp/ci-cache/nfd
    test_history: 10
    toolbox_stats: false
    extra_key: ignored
"#;

    #[test]
    fn parse_preserves_order_and_defaults() {
        let spec = parse(CONFIG).unwrap();
        assert_eq!(spec.test_history, 3);
        assert_eq!(spec.matrices.keys().collect::<Vec<_>>(), vec!["gpu-operator", "nfd"]);

        let gpu = &spec.matrices["gpu-operator"];
        assert_eq!(gpu.name, "gpu-operator");
        assert_eq!(gpu.index_filename, "?index");
        assert!(gpu.toolbox_stats);
        assert_eq!(gpu.tests.keys().collect::<Vec<_>>(), vec!["OCP 4.15|Master", "OCP 4.14|Master"]);
        assert_eq!(
            gpu.tests["OCP 4.15|Master"][0].prow_name(&gpu.prow_config),
            "periodic-ci-openshift-psap-ci-artifacts-release-4.15-nightly-gpu-operator-e2e-master"
        );

        let nfd = &spec.matrices["nfd"];
        assert_eq!(nfd.history_depth(spec.test_history), 10);
        assert!(!nfd.toolbox_stats);
        assert!(nfd.tests.is_empty());
    }

    #[test]
    fn default_fingerprint_is_md5() {
        let spec = parse(CONFIG).unwrap();
        let fp = spec.fingerprint_for(&spec.matrices["nfd"]).unwrap();
        assert_eq!(fp, Fingerprint::default_missing_page());
        assert_eq!(fp.algorithm(), FingerprintAlgorithm::Md5);
    }

    #[test]
    fn matrix_fingerprint_overrides_global() {
        let yaml = format!(
            "missing_page_fingerprint: {}\nmatrices:\n  a:\n    artifacts_url: https://s\n    artifacts_cache: /tmp/a\n    missing_page_fingerprint: {}\n  b:\n    artifacts_url: https://s\n    artifacts_cache: /tmp/b\n",
            "a".repeat(64),
            "b".repeat(32)
        );
        let spec = parse(&yaml).unwrap();
        assert_eq!(
            spec.fingerprint_for(&spec.matrices["a"]).unwrap().algorithm(),
            FingerprintAlgorithm::Md5
        );
        assert_eq!(
            spec.fingerprint_for(&spec.matrices["b"]).unwrap().algorithm(),
            FingerprintAlgorithm::Sha256
        );
    }

    #[test]
    fn rejects_bad_fingerprint() {
        let yaml = "missing_page_fingerprint: abcd\nmatrices: {}\n";
        assert!(matches!(parse(yaml), Err(ConfigError::Fingerprint { .. })));
    }

    #[test]
    fn rejects_missing_url_and_zero_history() {
        let no_url = "matrices:\n  a:\n    artifacts_cache: /tmp/a\n";
        assert!(matches!(parse(no_url), Err(ConfigError::Invalid(_))));

        let zero = "test_history: 0\nmatrices: {}\n";
        assert!(matches!(parse(zero), Err(ConfigError::Invalid(_))));

        let bad_index = "matrices:\n  a:\n    artifacts_url: https://s\n    artifacts_cache: /tmp/a\n    index_filename: a/b\n";
        assert!(matches!(parse(bad_index), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(matches!(parse("matrices: [unterminated"), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn load_from_file_and_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let spec = load(file.path()).unwrap();
        assert_eq!(spec.test_count(), 2);

        assert!(matches!(load("/nonexistent/config.yml"), Err(ConfigError::Io { .. })));
    }
}
