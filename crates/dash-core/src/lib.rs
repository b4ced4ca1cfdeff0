//! CI Dashboard Core
//!
//! Matrix configuration, test history resolution and report rendering.
//!
//! # Architecture
//!
//! ```text
//! YAML config ──► MatricesSpec ──► HistoryResolver ──► TestSpec.history ──► report
//!                                      │
//!                                      └─ ArtifactFetcher (dash-fetch)
//!
//! TestSpec.history ──► benchmarks ──► {prow_name}/{build}/gpu-burn/pod.log
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use dash_core::{config, report, resolver};
//!
//! let mut spec = config::load("matrices.yml")?;
//! resolver::resolve_matrices(&mut spec, None)?;
//! let html = report::render_report(&spec, "2023-11-14 22:13");
//! std::fs::write("matrix.html", html)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod benchmarks;
pub mod config;
pub mod error;
pub mod report;
pub mod resolver;
pub mod toolbox;
pub mod types;

// Re-exports
pub use error::{ConfigError, ExportError, ResolveError};
pub use report::{render_report, render_with_template, test_status, TestStatus};
pub use resolver::{resolve_latest_matrices, resolve_matrices, HistoryResolver};
pub use types::{MatricesSpec, MatrixSpec, TestResult, TestSpec, ToolboxStepResult, Versions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn config_to_report_without_history() {
        let spec = config::parse(
            "description: Nightly\ntest_history: 2\nmatrices:\n  gpu:\n    artifacts_url: https://s\n    artifacts_cache: /tmp/gpu\n    prow_config: periodic\n    tests:\n      \"4.15|Master\":\n        - test_name: e2e\n          branch: master\n",
        )
        .unwrap();
        let html = render_report(&spec, "now");
        assert!(html.contains("<h1>Nightly</h1>"));
        assert_eq!(html.matches("class=\"no_result\"").count(), 2);
    }
}
