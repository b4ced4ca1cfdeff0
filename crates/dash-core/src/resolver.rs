//! Test history resolution
//!
//! Turns a [`TestSpec`] into its most recent builds, newest first. Each build
//! is enriched independently: a missing or broken artifact downgrades one
//! field to its default and never aborts the loop. Only failing to list the
//! job's history directory is fatal.
//!
//! Artifact layout of one build:
//!
//! ```text
//! {prow_name}/{build}/finished.json
//! {prow_name}/{build}/artifacts/{test_name}/{prow_step}/finished.json
//! {prow_name}/{build}/artifacts/{test_name}/{prow_step}/FAILURE
//! {prow_name}/{build}/artifacts/{test_name}/{prow_step}/{ocp,operator}.version
//! {prow_name}/{build}/artifacts/{test_name}/{prow_step}/artifacts/{toolbox_step}/_ansible.log.json
//! {prow_name}/{build}/artifacts/{test_name}/{prow_step}/artifacts/_WARNING/*
//! ```

use crate::error::{ConfigError, ResolveError};
use crate::toolbox::{
    apply_markers, record_step, step_stats, ANSIBLE_LOG, EXPECTED_FAIL_MARKER, FLAKE_MARKER,
    UNREADABLE_MESSAGE,
};
use crate::types::{MatricesSpec, MatrixSpec, TestResult, TestSpec, NOT_AVAILABLE};
use chrono::{DateTime, Utc};
use dash_artifact::BuildId;
use dash_fetch::{
    ArtifactFetcher, CachePolicy, DiskCache, EntryFilter, FetchError, HttpOrigin, JsonObject,
    NotFoundDetector, Origin,
};
use serde_json::Value;
use tracing::Span;

/// Format of finish dates, always UTC
pub const FINISH_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Directory of warning files below the step artifacts
pub const WARNING_DIR: &str = "_WARNING";

/// File written by a step that ran and failed
pub const FAILURE_MARKER: &str = "FAILURE";

/// Version written by a step that could not determine it
const VERSION_MISSING: &str = "MISSING";

/// Version replacing a placeholder page that slipped through
const VERSION_PARSING_ERROR: &str = "[PARSING ERROR]";

/// Format a Unix timestamp as a finish date
///
/// Returns `N/A` for timestamps out of range.
#[must_use]
pub fn format_finish_date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map_or_else(
        || NOT_AVAILABLE.to_string(),
        |dt| dt.format(FINISH_DATE_FORMAT).to_string(),
    )
}

/// Map a build's `finished.json` onto a result
///
/// Absent or mistyped fields keep their defaults.
pub fn apply_finished(result: &mut TestResult, finished: &JsonObject) {
    result.passed = finished.get("passed").and_then(Value::as_bool).unwrap_or(false);
    result.result = finished
        .get("result")
        .and_then(Value::as_str)
        .unwrap_or(NOT_AVAILABLE)
        .to_string();
    result.finish_date = finished
        .get("timestamp")
        .and_then(timestamp_secs)
        .map_or_else(|| NOT_AVAILABLE.to_string(), format_finish_date);
}

/// Map a step's `finished.json` onto a result
///
/// Any recognised field marks the step as executed.
pub fn apply_step_finished(result: &mut TestResult, finished: &JsonObject) {
    if let Some(passed) = finished.get("passed").and_then(Value::as_bool) {
        result.step_passed = passed;
        result.step_executed = true;
    }
    match finished.get("result").and_then(Value::as_str) {
        Some(step_result) => {
            result.step_result = step_result.to_string();
            result.step_executed = true;
        }
        None => result.step_result = NOT_AVAILABLE.to_string(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp_secs(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

/// Normalise the content of a version file
fn clean_version(raw: &str) -> String {
    let version = raw.trim_end_matches('\n');
    if version.contains("doctype") {
        VERSION_PARSING_ERROR.to_string()
    } else if version == VERSION_MISSING {
        String::new()
    } else {
        version.to_string()
    }
}

/// Keep the last `count` valid build ids, newest first
///
/// Entries that are not build ids are dropped (with a warning) before the
/// truncation.
#[must_use]
pub fn select_builds(prow_name: &str, entries: Vec<String>, count: usize) -> Vec<BuildId> {
    let mut builds: Vec<BuildId> = entries
        .into_iter()
        .filter_map(|entry| match BuildId::new(&entry) {
            Ok(build) => Some(build),
            Err(e) => {
                tracing::warn!(prow_name, entry = %entry, error = %e, "skipping non-build directory");
                None
            }
        })
        .collect();

    let skip = builds.len().saturating_sub(count);
    builds.drain(..skip);
    builds.reverse();
    builds
}

/// Resolves test histories of one matrix
pub struct HistoryResolver<'m, O: Origin = HttpOrigin> {
    matrix: &'m MatrixSpec,
    fetcher: ArtifactFetcher<O>,
    span: Span,
}

impl<'m> HistoryResolver<'m, HttpOrigin> {
    /// Create a resolver fetching over HTTP
    ///
    /// # Errors
    /// Returns error if the matrix fingerprint is invalid
    pub fn new(spec: &MatricesSpec, matrix: &'m MatrixSpec) -> Result<Self, ConfigError> {
        let fetcher = http_fetcher(spec, matrix)?;
        Ok(Self::with_fetcher(matrix, fetcher))
    }
}

/// HTTP fetcher configured for a matrix
///
/// # Errors
/// Returns error if the matrix fingerprint is invalid
pub fn http_fetcher(
    spec: &MatricesSpec,
    matrix: &MatrixSpec,
) -> Result<ArtifactFetcher<HttpOrigin>, ConfigError> {
    let fingerprint = spec.fingerprint_for(matrix)?;
    let cache = DiskCache::new(&matrix.artifacts_cache).with_index_filename(&matrix.index_filename);
    Ok(
        ArtifactFetcher::with_origin(HttpOrigin::default(), &matrix.artifacts_url, cache)
            .with_detector(NotFoundDetector::new(fingerprint)),
    )
}

impl<'m, O: Origin> HistoryResolver<'m, O> {
    /// Create a resolver over an existing fetcher
    pub fn with_fetcher(matrix: &'m MatrixSpec, fetcher: ArtifactFetcher<O>) -> Self {
        let span = tracing::info_span!("matrix", name = %matrix.name);
        let fetcher = fetcher.with_span(span.clone());
        Self {
            matrix,
            fetcher,
            span,
        }
    }

    /// Replace the span log records are emitted in
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.fetcher = self.fetcher.with_span(span.clone());
        self.span = span;
        self
    }

    /// Matrix being resolved
    #[inline]
    #[must_use]
    pub fn matrix(&self) -> &'m MatrixSpec {
        self.matrix
    }

    /// Underlying fetcher
    #[inline]
    #[must_use]
    pub fn fetcher(&self) -> &ArtifactFetcher<O> {
        &self.fetcher
    }

    /// Last `count` builds of a test, newest first
    ///
    /// # Errors
    /// Returns error only if the job's history directory cannot be listed
    pub fn resolve_history(&self, test: &TestSpec, count: usize) -> Result<Vec<TestResult>, ResolveError> {
        let _enter = self.span.enter();
        let prow_name = test.prow_name(&self.matrix.prow_config);

        let entries = self
            .fetcher
            .list_directory(&prow_name, EntryFilter::directories(), CachePolicy::Refresh)
            .map_err(|source| ResolveError::Listing {
                prow_name: prow_name.clone(),
                source,
            })?;

        let builds = select_builds(&prow_name, entries, count);
        tracing::debug!(%prow_name, builds = builds.len(), "resolving history");

        Ok(builds
            .into_iter()
            .map(|build| self.resolve_build(test, build))
            .collect())
    }

    /// Build id from the job's `latest-build.txt`
    ///
    /// The file changes with every run, so it is always refetched and then
    /// evicted from the cache.
    ///
    /// # Errors
    /// Returns error if the file cannot be fetched or does not hold a build id
    pub fn latest_build(&self, test: &TestSpec) -> Result<BuildId, ResolveError> {
        let _enter = self.span.enter();
        let prow_name = test.prow_name(&self.matrix.prow_config);
        let path = format!("{prow_name}/latest-build.txt");

        let fetched = self.fetcher.fetch_text(&path, CachePolicy::Refresh);
        if let Err(e) = self.fetcher.evict(&path) {
            tracing::warn!(%path, error = %e, "failed to evict latest build");
        }

        let raw = fetched.map_err(|source| ResolveError::LatestBuild {
            prow_name: prow_name.clone(),
            source,
        })?;
        BuildId::new(&raw).map_err(|source| ResolveError::InvalidBuildId { prow_name, source })
    }

    /// Latest build of a test, fully resolved
    ///
    /// # Errors
    /// Returns error if the latest build id cannot be determined
    pub fn resolve_latest(&self, test: &TestSpec) -> Result<TestResult, ResolveError> {
        let build = self.latest_build(test)?;
        let _enter = self.span.enter();
        Ok(self.resolve_build(test, build))
    }

    /// Resolve one build; never fails
    #[must_use]
    pub fn resolve_build(&self, test: &TestSpec, build: BuildId) -> TestResult {
        let _enter = self.span.enter();
        let ctx = BuildContext::new(self.matrix, test, &build);
        let mut result = TestResult::new(build);

        match self.fetcher.fetch_json(&ctx.path("finished.json")) {
            Ok(finished) => apply_finished(&mut result, &finished),
            Err(e) => ctx.degraded("finished.json", &e),
        }

        if !result.passed {
            self.resolve_step_status(&ctx, &mut result);
        }
        self.resolve_versions(&ctx, test, &mut result);
        self.resolve_warnings(&ctx, &mut result);
        self.resolve_step_dirs(&ctx, &mut result);
        if self.matrix.toolbox_stats {
            self.resolve_toolbox(&ctx, &mut result);
        }

        tracing::debug!(
            prow_name = %ctx.prow_name,
            build = %result.build_id,
            passed = result.passed,
            step_executed = result.step_executed,
            "resolved build"
        );
        result
    }

    fn resolve_step_status(&self, ctx: &BuildContext, result: &mut TestResult) {
        match self.fetcher.fetch_json(&ctx.step_path("finished.json")) {
            Ok(finished) => apply_step_finished(result, &finished),
            Err(e) => ctx.degraded("step finished.json", &e),
        }

        if result.step_passed || result.step_executed {
            return;
        }
        match self.fetcher.fetch(&ctx.step_path(FAILURE_MARKER)) {
            Ok(content) => {
                if !String::from_utf8_lossy(&content).contains("doctype html") {
                    result.step_executed = true;
                }
            }
            Err(e) => ctx.degraded(FAILURE_MARKER, &e),
        }
    }

    fn resolve_versions(&self, ctx: &BuildContext, test: &TestSpec, result: &mut TestResult) {
        let files: [(&str, &mut String); 3] = [
            ("ocp.version", &mut result.versions.openshift),
            ("operator.version", &mut result.versions.operator),
            ("ci_artifact.git_version", &mut result.versions.ci_artifacts),
        ];

        let mut any_present = false;
        for (file, slot) in files {
            match self.fetcher.fetch_text(&ctx.step_path(file), CachePolicy::Trust) {
                Ok(raw) => {
                    *slot = clean_version(&raw);
                    any_present = true;
                }
                Err(e) => ctx.degraded(file, &e),
            }
        }

        if result.versions.operator == VERSION_PARSING_ERROR {
            if let Some(expected) = test.operator_version.as_deref() {
                result.versions.operator = format!("{VERSION_PARSING_ERROR} {expected}");
            }
        }
        if any_present {
            result.step_executed = true;
        }
    }

    fn resolve_warnings(&self, ctx: &BuildContext, result: &mut TestResult) {
        let dir = ctx.step_path(&format!("artifacts/{WARNING_DIR}"));
        let files = match self.fetcher.list_directory(&dir, EntryFilter::files(), CachePolicy::Trust) {
            Ok(files) => files,
            Err(e) => {
                ctx.degraded("warnings", &e);
                return;
            }
        };

        for file in files {
            match self.fetcher.fetch_text(&format!("{dir}/{file}"), CachePolicy::Trust) {
                Ok(message) => {
                    result.warnings.insert(file, message);
                }
                Err(e) => ctx.degraded("warning file", &e),
            }
        }
    }

    fn resolve_step_dirs(&self, ctx: &BuildContext, result: &mut TestResult) {
        let artifacts = ctx.step_path("artifacts");
        match self
            .fetcher
            .list_directory(&artifacts, EntryFilter::directories(), CachePolicy::Trust)
        {
            Ok(dirs) => result.toolbox_step_dirs = dirs,
            Err(e) => ctx.degraded("toolbox steps", &e),
        }
    }

    fn resolve_toolbox(&self, ctx: &BuildContext, result: &mut TestResult) {
        let artifacts = ctx.step_path("artifacts");
        let steps = result.toolbox_step_dirs.clone();

        for name in steps {
            let step_dir = format!("{artifacts}/{name}");
            let log = match self.fetcher.fetch_json_array(&format!("{step_dir}/{ANSIBLE_LOG}")) {
                Ok(log) => log,
                Err(e) => {
                    ctx.degraded(&format!("{name}/{ANSIBLE_LOG}"), &e);
                    continue;
                }
            };
            let Some(mut step) = step_stats(&name, &log) else {
                tracing::warn!(
                    prow_name = %ctx.prow_name,
                    build = %ctx.build,
                    step = %name,
                    "toolbox log without stats"
                );
                continue;
            };

            let (flake, expected_failure) = self.step_markers(ctx, &step_dir);
            apply_markers(&mut step, flake, expected_failure);
            record_step(result, step);
        }
    }

    fn step_markers(&self, ctx: &BuildContext, step_dir: &str) -> (Option<String>, Option<String>) {
        let files = match self.fetcher.list_directory(step_dir, EntryFilter::files(), CachePolicy::Trust) {
            Ok(files) => files,
            Err(e) => {
                ctx.degraded("toolbox step files", &e);
                return (None, None);
            }
        };

        let read_marker = |marker: &str| -> Option<String> {
            if !files.iter().any(|f| f == marker) {
                return None;
            }
            let path = format!("{step_dir}/{marker}");
            Some(match self.fetcher.fetch_text(&path, CachePolicy::Trust) {
                Ok(message) => message,
                Err(e) => {
                    ctx.degraded(marker, &e);
                    UNREADABLE_MESSAGE.to_string()
                }
            })
        };

        (read_marker(FLAKE_MARKER), read_marker(EXPECTED_FAIL_MARKER))
    }
}

impl<O: Origin> std::fmt::Debug for HistoryResolver<'_, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryResolver")
            .field("matrix", &self.matrix.name)
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

/// Directory of the operator step of one build, relative to the store root
#[must_use]
pub fn step_dir(matrix: &MatrixSpec, test: &TestSpec, build: &BuildId) -> String {
    format!(
        "{}/{build}/artifacts/{}/{}",
        test.prow_name(&matrix.prow_config),
        test.test_name,
        matrix.prow_step_for(test)
    )
}

/// Paths and log context of one build
struct BuildContext {
    prow_name: String,
    build: String,
    step_dir: String,
}

impl BuildContext {
    fn new(matrix: &MatrixSpec, test: &TestSpec, build: &BuildId) -> Self {
        Self {
            prow_name: test.prow_name(&matrix.prow_config),
            build: build.to_string(),
            step_dir: step_dir(matrix, test, build),
        }
    }

    fn path(&self, file: &str) -> String {
        format!("{}/{}/{file}", self.prow_name, self.build)
    }

    fn step_path(&self, file: &str) -> String {
        format!("{}/{file}", self.step_dir)
    }

    /// Log a field falling back to its default
    fn degraded(&self, what: &str, err: &FetchError) {
        if err.is_not_found() {
            tracing::debug!(prow_name = %self.prow_name, build = %self.build, what, "not found");
        } else {
            tracing::warn!(prow_name = %self.prow_name, build = %self.build, what, error = %err, "fetch failed, using defaults");
        }
    }
}

/// Resolve every test of every matrix over HTTP
///
/// `history_override` replaces the configured depths when given. Each
/// matrix records the depth it was resolved with, so the report pads to it.
///
/// # Errors
/// Returns the first listing failure
pub fn resolve_matrices(spec: &mut MatricesSpec, history_override: Option<usize>) -> Result<(), ResolveError> {
    resolve_matrices_with(spec, history_override, http_fetcher)
}

/// Resolve every test of every matrix with fetchers from `make_fetcher`
///
/// # Errors
/// Returns the first fetcher construction or listing failure
pub fn resolve_matrices_with<O, F>(
    spec: &mut MatricesSpec,
    history_override: Option<usize>,
    mut make_fetcher: F,
) -> Result<(), ResolveError>
where
    O: Origin,
    F: FnMut(&MatricesSpec, &MatrixSpec) -> Result<ArtifactFetcher<O>, ConfigError>,
{
    if let Some(depth) = history_override {
        spec.test_history = depth;
    }

    let names: Vec<String> = spec.matrices.keys().cloned().collect();
    for name in names {
        let (depth, histories) = {
            let Some(matrix) = spec.matrices.get(&name) else {
                continue;
            };
            let depth = history_override.unwrap_or_else(|| matrix.history_depth(spec.test_history));
            tracing::info!(matrix = %name, description = %matrix.description, tests = matrix.test_count(), depth, "resolving matrix");

            let resolver = HistoryResolver::with_fetcher(matrix, make_fetcher(spec, matrix)?);
            let mut histories = Vec::with_capacity(matrix.test_count());
            for test in matrix.tests.values().flatten() {
                histories.push(resolver.resolve_history(test, depth)?);
            }
            (depth, histories)
        };

        if let Some(matrix) = spec.matrices.get_mut(&name) {
            matrix.test_history = Some(depth);
            for (test, history) in matrix.tests.values_mut().flatten().zip(histories) {
                test.history = history;
            }
        }
    }
    Ok(())
}

/// Attach the latest build of every test over HTTP
///
/// # Errors
/// Returns the first test whose latest build cannot be determined
pub fn resolve_latest_matrices(spec: &mut MatricesSpec) -> Result<(), ResolveError> {
    resolve_latest_matrices_with(spec, http_fetcher)
}

/// Attach the latest build of every test with fetchers from `make_fetcher`
///
/// # Errors
/// Returns the first fetcher construction or latest-build failure
pub fn resolve_latest_matrices_with<O, F>(spec: &mut MatricesSpec, mut make_fetcher: F) -> Result<(), ResolveError>
where
    O: Origin,
    F: FnMut(&MatricesSpec, &MatrixSpec) -> Result<ArtifactFetcher<O>, ConfigError>,
{
    spec.test_history = 1;

    let names: Vec<String> = spec.matrices.keys().cloned().collect();
    for name in names {
        let latest = {
            let Some(matrix) = spec.matrices.get(&name) else {
                continue;
            };
            tracing::info!(matrix = %name, description = %matrix.description, "resolving latest builds");

            let resolver = HistoryResolver::with_fetcher(matrix, make_fetcher(spec, matrix)?);
            let mut latest = Vec::with_capacity(matrix.test_count());
            for test in matrix.tests.values().flatten() {
                latest.push(resolver.resolve_latest(test)?);
            }
            latest
        };

        if let Some(matrix) = spec.matrices.get_mut(&name) {
            matrix.test_history = Some(1);
            for (test, result) in matrix.tests.values_mut().flatten().zip(latest) {
                test.history = vec![result];
            }
        }
    }
    Ok(())
}
