//! Toolbox step statistics
//!
//! Toolbox steps run Ansible and leave an `_ansible.log.json` behind. Only the
//! last record of that log is read: its `stats.localhost` counters summarise
//! the whole play.

use crate::types::{TestResult, ToolboxStepResult};
use dash_fetch::parsers::get_path;
use dash_fetch::JsonArray;

/// Log file marking a directory as a toolbox step
pub const ANSIBLE_LOG: &str = "_ansible.log.json";

/// Marker file holding a flake explanation
pub const FLAKE_MARKER: &str = "FLAKE";

/// Marker file holding an expected-failure explanation
pub const EXPECTED_FAIL_MARKER: &str = "EXPECTED_FAIL";

/// Message recorded when a marker file exists but cannot be read
pub const UNREADABLE_MESSAGE: &str = "message cannot be downloaded";

/// Counters of the last record of an Ansible log
///
/// Returns `None` when the log is empty or its last record lacks any of the
/// counters.
#[must_use]
pub fn step_stats(name: &str, log: &JsonArray) -> Option<ToolboxStepResult> {
    let last = log.last()?;
    let counter = |key: &str| get_path(last, &format!("stats.localhost.{key}")).and_then(as_count);
    Some(ToolboxStepResult::new(
        name,
        counter("ok")?,
        counter("failures")?,
        counter("ignored")?,
    ))
}

#[allow(clippy::cast_possible_truncation)]
fn as_count(value: &serde_json::Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

/// Apply the step's marker files
///
/// An expected failure removes one failure from the step's count.
pub fn apply_markers(
    step: &mut ToolboxStepResult,
    flake: Option<String>,
    expected_failure: Option<String>,
) {
    if let Some(message) = expected_failure {
        step.expected_failure = Some(message);
        step.failures -= 1;
    }
    if let Some(message) = flake {
        step.flake_failure = Some(message);
    }
}

/// Add a step to a result, updating the totals
///
/// A flaky step that still counts failures marks the whole result as a flake
/// failure.
pub fn record_step(result: &mut TestResult, step: ToolboxStepResult) {
    tracing::debug!(
        step = %step.name,
        ok = step.ok,
        failures = step.failures,
        ignored = step.ignored,
        "toolbox step"
    );
    result.ok += step.ok;
    result.failures += step.failures;
    result.ignored += step.ignored;
    if step.flake_failure.is_some() && step.failures != 0 {
        result.flake_failure = true;
    }
    result.toolbox_steps.push(step);
}
