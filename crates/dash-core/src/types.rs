//! Core types for the CI dashboard
//!
//! Defines the matrix configuration model and the per-build results the
//! resolver attaches to it.

use dash_artifact::{BuildId, DEFAULT_INDEX_FILENAME};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Schema version understood by this crate
pub const SPEC_VERSION: &str = "v1";

/// History depth used when the configuration names none
pub const DEFAULT_TEST_HISTORY: usize = 5;

/// Placeholder for results and dates that could not be determined
pub const NOT_AVAILABLE: &str = "N/A";

fn default_version() -> String {
    SPEC_VERSION.to_string()
}

const fn default_test_history() -> usize {
    DEFAULT_TEST_HISTORY
}

fn default_index_filename() -> String {
    DEFAULT_INDEX_FILENAME.to_string()
}

const fn default_true() -> bool {
    true
}

/// Root of the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatricesSpec {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: String,

    /// Free text shown at the top of the report
    #[serde(default)]
    pub description: String,

    /// Number of builds resolved per test
    #[serde(default = "default_test_history")]
    pub test_history: usize,

    /// Hex digest of the store's missing-page residue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_page_fingerprint: Option<String>,

    /// Matrices, in file order
    #[serde(default)]
    pub matrices: IndexMap<String, MatrixSpec>,
}

impl MatricesSpec {
    /// Create an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            test_history: DEFAULT_TEST_HISTORY,
            missing_page_fingerprint: None,
            matrices: IndexMap::new(),
        }
    }

    /// Add a matrix
    #[must_use]
    pub fn with_matrix(mut self, name: impl Into<String>, matrix: MatrixSpec) -> Self {
        let name = name.into();
        let mut matrix = matrix;
        matrix.name.clone_from(&name);
        self.matrices.insert(name, matrix);
        self
    }

    /// Set the global history depth
    #[must_use]
    pub fn with_test_history(mut self, depth: usize) -> Self {
        self.test_history = depth;
        self
    }

    /// Total number of tests across all matrices
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.matrices.values().map(MatrixSpec::test_count).sum()
    }
}

impl Default for MatricesSpec {
    fn default() -> Self {
        Self::new()
    }
}

/// Tests sharing one artifact store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixSpec {
    /// Key of this matrix in the configuration
    #[serde(skip)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Base URL of the artifact store
    #[serde(default)]
    pub artifacts_url: String,

    /// Local mirror of the artifact store
    #[serde(default)]
    pub artifacts_cache: PathBuf,

    /// Filename under which listing pages are cached
    #[serde(default = "default_index_filename")]
    pub index_filename: String,

    /// Base URL of the Prow job viewer
    #[serde(default)]
    pub viewer_url: String,

    /// History depth for this matrix, overriding the global one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_history: Option<usize>,

    /// Prow config prefix of the job names
    #[serde(default)]
    pub prow_config: String,

    /// Step directory holding the operator results
    #[serde(default)]
    pub prow_step: String,

    #[serde(default)]
    pub operator_name: String,

    /// Missing-page fingerprint for this store, overriding the global one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_page_fingerprint: Option<String>,

    /// Collect toolbox step statistics
    #[serde(default = "default_true")]
    pub toolbox_stats: bool,

    /// Test groups, in file order
    #[serde(default)]
    pub tests: IndexMap<String, Vec<TestSpec>>,
}

impl MatrixSpec {
    /// Create a matrix over an artifact store
    #[must_use]
    pub fn new(artifacts_url: impl Into<String>, artifacts_cache: impl Into<PathBuf>) -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            artifacts_url: artifacts_url.into(),
            artifacts_cache: artifacts_cache.into(),
            index_filename: default_index_filename(),
            viewer_url: String::new(),
            test_history: None,
            prow_config: String::new(),
            prow_step: String::new(),
            operator_name: String::new(),
            missing_page_fingerprint: None,
            toolbox_stats: true,
            tests: IndexMap::new(),
        }
    }

    /// Set the prow config prefix
    #[must_use]
    pub fn with_prow_config(mut self, prow_config: impl Into<String>) -> Self {
        self.prow_config = prow_config.into();
        self
    }

    /// Set the default step directory
    #[must_use]
    pub fn with_prow_step(mut self, prow_step: impl Into<String>) -> Self {
        self.prow_step = prow_step.into();
        self
    }

    /// Set the viewer URL
    #[must_use]
    pub fn with_viewer_url(mut self, viewer_url: impl Into<String>) -> Self {
        self.viewer_url = viewer_url.into();
        self
    }

    /// Add a test to a group
    #[must_use]
    pub fn with_test(mut self, group: impl Into<String>, test: TestSpec) -> Self {
        self.tests.entry(group.into()).or_default().push(test);
        self
    }

    /// History depth, falling back to `global`
    #[inline]
    #[must_use]
    pub fn history_depth(&self, global: usize) -> usize {
        self.test_history.unwrap_or(global)
    }

    /// Number of tests in all groups
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.values().map(Vec::len).sum()
    }

    /// Step directory of a test
    #[must_use]
    pub fn prow_step_for<'a>(&'a self, test: &'a TestSpec) -> &'a str {
        test.prow_step
            .as_deref()
            .filter(|step| !step.is_empty())
            .unwrap_or(&self.prow_step)
    }
}

/// One test of a matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    #[serde(default)]
    pub test_name: String,

    #[serde(default)]
    pub branch: String,

    #[serde(default)]
    pub variant: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_version: Option<String>,

    /// Step directory, overriding the matrix one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prow_step: Option<String>,

    /// Explicit Prow job name, bypassing derivation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prow_name: Option<String>,

    /// Resolved builds, newest first
    #[serde(skip)]
    pub history: Vec<TestResult>,
}

impl TestSpec {
    /// Create a test
    #[must_use]
    pub fn new(test_name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            branch: branch.into(),
            ..Self::default()
        }
    }

    /// Set the variant
    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    /// Set the step directory override
    #[must_use]
    pub fn with_prow_step(mut self, prow_step: impl Into<String>) -> Self {
        self.prow_step = Some(prow_step.into());
        self
    }

    /// Set an explicit Prow job name
    #[must_use]
    pub fn with_prow_name(mut self, prow_name: impl Into<String>) -> Self {
        self.prow_name = Some(prow_name.into());
        self
    }

    /// Prow job name
    ///
    /// `{prow_config}-{branch}[-{variant}]-{test_name}` unless set explicitly.
    /// Names are not checked for uniqueness.
    #[must_use]
    pub fn prow_name(&self, prow_config: &str) -> String {
        if let Some(name) = self.prow_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if self.variant.is_empty() {
            format!("{prow_config}-{}-{}", self.branch, self.test_name)
        } else {
            format!("{prow_config}-{}-{}-{}", self.branch, self.variant, self.test_name)
        }
    }
}

/// Versions reported by a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    pub openshift: String,
    pub operator: String,
    pub ci_artifacts: String,
}

impl Versions {
    /// Check if no version was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.openshift.is_empty() && self.operator.is_empty() && self.ci_artifacts.is_empty()
    }
}

/// Statistics of one toolbox step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolboxStepResult {
    /// Step directory name
    pub name: String,
    pub ok: i64,
    pub failures: i64,
    pub ignored: i64,
    /// Content of the step's `FLAKE` file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flake_failure: Option<String>,
    /// Content of the step's `EXPECTED_FAIL` file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_failure: Option<String>,
}

impl ToolboxStepResult {
    /// Create a step result from raw counts
    #[must_use]
    pub fn new(name: impl Into<String>, ok: i64, failures: i64, ignored: i64) -> Self {
        Self {
            name: name.into(),
            ok,
            failures,
            ignored,
            flake_failure: None,
            expected_failure: None,
        }
    }
}

/// Outcome of one build of a test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub build_id: BuildId,
    pub passed: bool,
    /// Free-text result, `N/A` when unknown
    pub result: String,
    /// `%Y-%m-%d %H:%M` in UTC, `N/A` when unknown
    pub finish_date: String,

    pub step_executed: bool,
    pub step_passed: bool,
    pub step_result: String,

    /// Every directory under the step's `artifacts/`, in listing order
    pub toolbox_step_dirs: Vec<String>,
    /// Toolbox steps, in discovery order
    pub toolbox_steps: Vec<ToolboxStepResult>,
    pub ok: i64,
    pub failures: i64,
    pub ignored: i64,
    /// A flaky step failed
    pub flake_failure: bool,

    /// Warning file name to message
    pub warnings: BTreeMap<String, String>,
    pub versions: Versions,
}

impl TestResult {
    /// Create a result with every field at its default
    #[must_use]
    pub fn new(build_id: BuildId) -> Self {
        Self {
            build_id,
            passed: false,
            result: NOT_AVAILABLE.to_string(),
            finish_date: NOT_AVAILABLE.to_string(),
            step_executed: false,
            step_passed: false,
            step_result: NOT_AVAILABLE.to_string(),
            toolbox_step_dirs: Vec::new(),
            toolbox_steps: Vec::new(),
            ok: 0,
            failures: 0,
            ignored: 0,
            flake_failure: false,
            warnings: BTreeMap::new(),
            versions: Versions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prow_name_without_variant() {
        let test = TestSpec::new("e2e", "master");
        assert_eq!(test.prow_name("periodic-ci-gpu-operator"), "periodic-ci-gpu-operator-master-e2e");
    }

    #[test]
    fn prow_name_with_variant() {
        let test = TestSpec::new("e2e", "release-4.15").with_variant("nightly");
        assert_eq!(test.prow_name("periodic-ci"), "periodic-ci-release-4.15-nightly-e2e");
    }

    #[test]
    fn explicit_prow_name_wins() {
        let test = TestSpec::new("e2e", "master").with_prow_name("pull-ci-custom");
        assert_eq!(test.prow_name("periodic-ci"), "pull-ci-custom");
    }

    #[test]
    fn prow_step_override() {
        let matrix = MatrixSpec::new("https://store", "/tmp/c").with_prow_step("gpu-operator-e2e");
        let plain = TestSpec::new("e2e", "master");
        let custom = TestSpec::new("e2e", "master").with_prow_step("nfd-e2e");
        assert_eq!(matrix.prow_step_for(&plain), "gpu-operator-e2e");
        assert_eq!(matrix.prow_step_for(&custom), "nfd-e2e");
    }

    #[test]
    fn history_depth_falls_back_to_global() {
        let mut matrix = MatrixSpec::new("https://store", "/tmp/c");
        assert_eq!(matrix.history_depth(7), 7);
        matrix.test_history = Some(2);
        assert_eq!(matrix.history_depth(7), 2);
    }

    #[test]
    fn result_defaults() {
        let result = TestResult::new(BuildId::new("1").unwrap());
        assert!(!result.passed);
        assert_eq!(result.result, NOT_AVAILABLE);
        assert_eq!(result.finish_date, NOT_AVAILABLE);
        assert!(result.versions.is_empty());
    }

    #[test]
    fn spec_builders_count_tests() {
        let spec = MatricesSpec::new().with_matrix(
            "gpu",
            MatrixSpec::new("https://store", "/tmp/c")
                .with_test("Master|OCP 4.15", TestSpec::new("e2e", "master"))
                .with_test("Master|OCP 4.15", TestSpec::new("upgrade", "master")),
        );
        assert_eq!(spec.test_count(), 2);
        assert_eq!(spec.matrices["gpu"].name, "gpu");
    }
}
