//! GPU burn log export for MatrixBenchmarking
//!
//! Copies the `gpu_burn.*.log` of every resolved build to
//! `{output_dir}/{prow_name}/{build}/gpu-burn/pod.log`.

use crate::error::{ConfigError, ExportError};
use crate::resolver::{http_fetcher, step_dir};
use crate::types::{MatricesSpec, MatrixSpec, TestResult, TestSpec};
use dash_artifact::BuildId;
use dash_fetch::{ArtifactFetcher, CachePolicy, EntryFilter, FetchResult, Origin};
use std::fs;
use std::path::{Path, PathBuf};

/// Marker in the names of toolbox steps that run GPU burn
pub const GPU_BURN_STEP: &str = "_run_gpu_burn";

/// Directory the CLI exports to when none is given
pub const DEFAULT_OUTPUT_DIR: &str = "output/matrix_benchmarking/";

const GPU_BURN_LOG_PREFIX: &str = "gpu_burn.";
const GPU_BURN_LOG_SUFFIX: &str = ".log";
const EXPORT_DIR: &str = "gpu-burn";
const EXPORT_FILE: &str = "pod.log";

/// Check if a step file is a GPU burn log
#[must_use]
pub fn is_gpu_burn_log(filename: &str) -> bool {
    filename.starts_with(GPU_BURN_LOG_PREFIX) && filename.ends_with(GPU_BURN_LOG_SUFFIX)
}

/// Where the log of one build is exported
#[must_use]
pub fn export_path(output_dir: &Path, prow_name: &str, build: &BuildId) -> PathBuf {
    output_dir
        .join(prow_name)
        .join(build.as_str())
        .join(EXPORT_DIR)
        .join(EXPORT_FILE)
}

/// GPU burn log of one build
///
/// Looks through the GPU burn steps in listing order and returns the first
/// `gpu_burn.*.log` found, or `None` when no step has one.
///
/// # Errors
/// Returns the first listing or fetch failure
pub fn fetch_gpu_burn_log<O: Origin>(
    fetcher: &ArtifactFetcher<O>,
    matrix: &MatrixSpec,
    test: &TestSpec,
    result: &TestResult,
) -> FetchResult<Option<Vec<u8>>> {
    let artifacts = format!("{}/artifacts", step_dir(matrix, test, &result.build_id));
    let steps = result
        .toolbox_step_dirs
        .iter()
        .filter(|name| name.contains(GPU_BURN_STEP));

    for step in steps {
        let dir = format!("{artifacts}/{step}");
        let files = fetcher.list_directory(&dir, EntryFilter::files(), CachePolicy::Trust)?;
        tracing::debug!(%dir, files = files.len(), "GPU burn step");
        if let Some(log) = files.iter().find(|f| is_gpu_burn_log(f)) {
            return fetcher.fetch(&format!("{dir}/{log}")).map(Some);
        }
    }
    Ok(None)
}

/// Outcome of an export run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: usize,
    /// Builds without a GPU burn log
    pub missing: usize,
    /// Builds whose log could not be fetched
    pub failed: usize,
}

/// Export the GPU burn logs of every resolved build over HTTP
///
/// # Errors
/// Returns error if a fetcher cannot be configured or a log cannot be written
pub fn export_gpu_burn_logs(spec: &MatricesSpec, output_dir: &Path) -> Result<ExportSummary, ExportError> {
    export_gpu_burn_logs_with(spec, output_dir, http_fetcher)
}

/// Export the GPU burn logs of every resolved build with fetchers from
/// `make_fetcher`
///
/// Fetch failures and builds without a log are logged and skipped.
///
/// # Errors
/// Returns error if a fetcher cannot be configured or a log cannot be written
pub fn export_gpu_burn_logs_with<O, F>(
    spec: &MatricesSpec,
    output_dir: &Path,
    mut make_fetcher: F,
) -> Result<ExportSummary, ExportError>
where
    O: Origin,
    F: FnMut(&MatricesSpec, &MatrixSpec) -> Result<ArtifactFetcher<O>, ConfigError>,
{
    let mut summary = ExportSummary::default();

    for matrix in spec.matrices.values() {
        let span = tracing::info_span!("matrix", name = %matrix.name);
        let fetcher = make_fetcher(spec, matrix)?.with_span(span.clone());
        let _enter = span.enter();

        for test in matrix.tests.values().flatten() {
            let prow_name = test.prow_name(&matrix.prow_config);
            for result in &test.history {
                let build = &result.build_id;
                let log = match fetch_gpu_burn_log(&fetcher, matrix, test, result) {
                    Ok(Some(log)) => log,
                    Ok(None) => {
                        tracing::warn!(%prow_name, %build, "could not find GPU burn logs");
                        summary.missing += 1;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(%prow_name, %build, error = %e, "failed to fetch GPU burn logs");
                        summary.failed += 1;
                        continue;
                    }
                };

                let path = export_path(output_dir, &prow_name, build);
                write_log(&path, &log)?;
                tracing::info!(path = %path.display(), bytes = log.len(), "exported GPU burn log");
                summary.exported += 1;
            }
        }
    }
    Ok(summary)
}

fn write_log(path: &Path, content: &[u8]) -> Result<(), ExportError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    };
    write().map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
