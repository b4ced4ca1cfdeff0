//! HTML matrix report
//!
//! Renders resolved matrices as a self-contained HTML page: one table per
//! test group, one row per test, one cell per build slot. A user template can
//! wrap the generated tables through `{{ matrix }}`, `{{ date }}` and
//! `{{ description }}` placeholders.

use crate::types::{MatricesSpec, MatrixSpec, TestResult, TestSpec};
use std::fmt::{self, Display, Formatter, Write as _};

/// Placeholder replaced by the rendered matrices
pub const MATRIX_PLACEHOLDER: &str = "{{ matrix }}";

/// Placeholder replaced by the generation date
pub const DATE_PLACEHOLDER: &str = "{{ date }}";

/// Placeholder replaced by the configuration description
pub const DESCRIPTION_PLACEHOLDER: &str = "{{ description }}";

/// Classification of one build for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestStatus {
    /// The test passed
    Success,
    /// The test failed before the operator step ran
    StepMissing,
    /// The test failed but the operator step passed
    StepSuccess,
    /// The operator step failed
    StepFailed,
}

impl TestStatus {
    /// CSS class and stable identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::StepMissing => "step_missing",
            Self::StepSuccess => "step_success",
            Self::StepFailed => "step_failed",
        }
    }

    /// Human readable explanation
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "Test passed",
            Self::StepMissing => "Test failed but operator step wasn't executed",
            Self::StepSuccess => "Test failed but the operator step passed",
            Self::StepFailed => "Test failed because the operator step failed",
        }
    }
}

impl Display for TestStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a build
#[must_use]
pub fn test_status(result: &TestResult) -> TestStatus {
    if result.passed {
        TestStatus::Success
    } else if !result.step_executed {
        TestStatus::StepMissing
    } else if result.step_passed {
        TestStatus::StepSuccess
    } else {
        TestStatus::StepFailed
    }
}

/// Explanation of a build's status
#[must_use]
pub fn test_status_description(result: &TestResult) -> &'static str {
    test_status(result).description()
}

/// URL of a build's step artifacts
#[must_use]
pub fn artifacts_url(matrix: &MatrixSpec, test: &TestSpec, result: &TestResult) -> String {
    format!(
        "{}/{}/{}/artifacts/{}/{}",
        matrix.artifacts_url.trim_end_matches('/'),
        test.prow_name(&matrix.prow_config),
        result.build_id,
        test.test_name,
        matrix.prow_step_for(test)
    )
}

/// URL of a build in the Prow viewer
#[must_use]
pub fn viewer_url(matrix: &MatrixSpec, test: &TestSpec, result: &TestResult) -> String {
    format!(
        "{}/{}/{}",
        matrix.viewer_url.trim_end_matches('/'),
        test.prow_name(&matrix.prow_config),
        result.build_id
    )
}

/// Display name of a test group: the text after the first `|`
#[must_use]
pub fn group_name(group: &str) -> &str {
    group.split_once('|').map_or(group, |(_, name)| name)
}

/// Number of empty slots after a test's history
#[must_use]
pub fn missing_history_slots(test: &TestSpec, depth: usize) -> usize {
    depth.saturating_sub(test.history.len())
}

/// Render the matrix tables without page chrome
#[must_use]
pub fn render_matrices(spec: &MatricesSpec) -> String {
    let mut out = String::new();
    for (name, matrix) in &spec.matrices {
        let depth = matrix.history_depth(spec.test_history);
        let title = if matrix.description.is_empty() {
            name.as_str()
        } else {
            matrix.description.as_str()
        };
        let _ = writeln!(out, "<section class=\"matrix\" id=\"{}\">", html_escape(name));
        let _ = writeln!(out, "<h2>{}</h2>", html_escape(title));
        for (group, tests) in &matrix.tests {
            out.push_str(&render_group(matrix, group, tests, depth));
        }
        out.push_str("</section>\n");
    }
    out
}

fn render_group(matrix: &MatrixSpec, group: &str, tests: &[TestSpec], depth: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<h3>{}</h3>", html_escape(group_name(group)));
    out.push_str("<table class=\"group\">\n<thead><tr><th>Test</th>");
    for slot in 0..depth {
        let _ = write!(out, "<th>{}</th>", if slot == 0 { "Latest".to_string() } else { format!("-{slot}") });
    }
    out.push_str("</tr></thead>\n<tbody>\n");

    for test in tests {
        out.push_str("<tr>");
        out.push_str(&render_test_header(matrix, test));
        for result in test.history.iter().take(depth) {
            out.push_str(&render_result_cell(matrix, test, result));
        }
        for _ in 0..missing_history_slots(test, depth) {
            out.push_str("<td class=\"no_result\"></td>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
    out
}

fn render_test_header(matrix: &MatrixSpec, test: &TestSpec) -> String {
    let prow_name = test.prow_name(&matrix.prow_config);
    let mut label = html_escape(&test.test_name);
    if !test.variant.is_empty() {
        let _ = write!(label, " <span class=\"variant\">{}</span>", html_escape(&test.variant));
    }
    if let Some(version) = test.operator_version.as_deref() {
        let _ = write!(label, " <span class=\"operator_version\">{}</span>", html_escape(version));
    }
    format!(
        "<th class=\"test\" title=\"{}\">{label}<br><span class=\"branch\">{}</span></th>",
        html_escape(&prow_name),
        html_escape(&test.branch),
    )
}

fn render_result_cell(matrix: &MatrixSpec, test: &TestSpec, result: &TestResult) -> String {
    let status = test_status(result);
    let mut details = String::new();

    if !result.toolbox_steps.is_empty() {
        let _ = write!(
            details,
            "<br><span class=\"stats\">ok {} / failures {} / ignored {}</span>",
            result.ok, result.failures, result.ignored
        );
    }
    if result.flake_failure {
        details.push_str("<br><span class=\"flake\">flake</span>");
    }
    if !result.warnings.is_empty() {
        let names: Vec<&str> = result.warnings.keys().map(String::as_str).collect();
        let _ = write!(
            details,
            "<br><span class=\"warnings\" title=\"{}\">{} warning{}</span>",
            html_escape(&names.join(", ")),
            names.len(),
            if names.len() == 1 { "" } else { "s" }
        );
    }
    if !result.versions.openshift.is_empty() {
        let _ = write!(details, "<br><span class=\"version\">OCP {}</span>", html_escape(&result.versions.openshift));
    }
    if !result.versions.operator.is_empty() {
        let _ = write!(details, "<br><span class=\"version\">{}</span>", html_escape(&result.versions.operator));
    }

    format!(
        "<td class=\"{status}\" title=\"{descr}\"><a href=\"{viewer}\">{date}</a> \
         <a class=\"artifacts\" href=\"{artifacts}\">[artifacts]</a><br>\
         <span class=\"result\">{outcome}</span>{details}</td>",
        descr = html_escape(status.description()),
        viewer = html_escape(&viewer_url(matrix, test, result)),
        date = html_escape(&result.finish_date),
        artifacts = html_escape(&artifacts_url(matrix, test, result)),
        outcome = html_escape(&result.result),
    )
}

/// Render the full report page
#[must_use]
pub fn render_report(spec: &MatricesSpec, generated_at: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>CI Dashboard - {date}</title>
    <style>{css}</style>
</head>
<body>
    <h1>{description}</h1>
    <p class="generated">Generated on {date}</p>
    {matrices}
</body>
</html>
"#,
        date = html_escape(generated_at),
        css = inline_css(),
        description = html_escape(if spec.description.is_empty() { "CI Dashboard" } else { &spec.description }),
        matrices = render_matrices(spec),
    )
}

/// Render inside a user template
///
/// Placeholders are substituted in a single left-to-right pass, so text
/// coming from the configuration is never expanded again. The matrices are
/// only rendered if the template asks for them.
#[must_use]
pub fn render_with_template(template: &str, spec: &MatricesSpec, generated_at: &str) -> String {
    const PLACEHOLDERS: [&str; 3] = [DATE_PLACEHOLDER, DESCRIPTION_PLACEHOLDER, MATRIX_PLACEHOLDER];

    let mut matrices: Option<String> = None;
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((at, placeholder)) = PLACEHOLDERS
        .iter()
        .filter_map(|p| rest.find(p).map(|at| (at, *p)))
        .min_by_key(|&(at, _)| at)
    {
        out.push_str(&rest[..at]);
        match placeholder {
            DATE_PLACEHOLDER => out.push_str(&html_escape(generated_at)),
            DESCRIPTION_PLACEHOLDER => out.push_str(&html_escape(&spec.description)),
            _ => out.push_str(matrices.get_or_insert_with(|| render_matrices(spec))),
        }
        rest = &rest[at + placeholder.len()..];
    }
    out.push_str(rest);
    out
}

fn inline_css() -> &'static str {
    r"
body { font-family: sans-serif; margin: 1em 2em; }
table.group { border-collapse: collapse; margin-bottom: 1.5em; }
table.group th, table.group td { border: 1px solid #ccc; padding: 4px 8px; font-size: 0.9em; }
th.test { text-align: left; }
td.success { background: #c8e6c9; }
td.step_success { background: #fff59d; }
td.step_failed { background: #ef9a9a; }
td.step_missing { background: #ffcc80; }
td.no_result { background: #eee; }
span.flake { color: #6a1b9a; font-weight: bold; }
span.warnings { color: #e65100; }
span.branch, span.version, span.variant { color: #555; }
"
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_artifact::BuildId;

    fn result(build: &str, passed: bool, step_executed: bool, step_passed: bool) -> TestResult {
        let mut result = TestResult::new(BuildId::new(build).unwrap());
        result.passed = passed;
        result.step_executed = step_executed;
        result.step_passed = step_passed;
        result
    }

    fn matrix() -> MatrixSpec {
        MatrixSpec::new("https://gcsweb.example/logs/", "/tmp/cache")
            .with_prow_config("periodic-ci")
            .with_prow_step("gpu-operator-e2e")
            .with_viewer_url("https://prow.example/view")
    }

    #[test]
    fn status_classification() {
        assert_eq!(test_status(&result("1", true, false, false)), TestStatus::Success);
        assert_eq!(test_status(&result("1", false, false, false)), TestStatus::StepMissing);
        assert_eq!(test_status(&result("1", false, true, true)), TestStatus::StepSuccess);
        assert_eq!(test_status(&result("1", false, true, false)), TestStatus::StepFailed);
        assert_eq!(
            test_status_description(&result("1", false, true, false)),
            "Test failed because the operator step failed"
        );
    }

    #[test]
    fn urls() {
        let matrix = matrix();
        let test = TestSpec::new("e2e", "master");
        let res = result("42", true, false, false);
        assert_eq!(
            artifacts_url(&matrix, &test, &res),
            "https://gcsweb.example/logs/periodic-ci-master-e2e/42/artifacts/e2e/gpu-operator-e2e"
        );
        assert_eq!(viewer_url(&matrix, &test, &res), "https://prow.example/view/periodic-ci-master-e2e/42");
    }

    #[test]
    fn group_names() {
        assert_eq!(group_name("4.15|Master branch"), "Master branch");
        assert_eq!(group_name("a|b|c"), "b|c");
        assert_eq!(group_name("plain"), "plain");
    }

    #[test]
    fn missing_slots() {
        let mut test = TestSpec::new("e2e", "master");
        test.history = vec![result("2", true, false, false), result("1", true, false, false)];
        assert_eq!(missing_history_slots(&test, 5), 3);
        assert_eq!(missing_history_slots(&test, 1), 0);
    }

    #[test]
    fn report_escapes_and_pads() {
        let mut test = TestSpec::new("e2e<script>", "master");
        let mut res = result("7", false, true, false);
        res.result = "FAILURE".to_string();
        test.history = vec![res];
        let spec = MatricesSpec::new()
            .with_test_history(3)
            .with_matrix("gpu", matrix().with_test("4.15|Master", test));

        let html = render_report(&spec, "2023-11-14 22:13");
        assert!(html.contains("e2e&lt;script&gt;"));
        assert!(!html.contains("e2e<script>"));
        assert!(html.contains("class=\"step_failed\""));
        assert_eq!(html.matches("class=\"no_result\"").count(), 2);
        assert!(html.contains("<h3>Master</h3>"));
    }

    #[test]
    fn template_substitution() {
        let mut spec = MatricesSpec::new().with_matrix("gpu", matrix());
        spec.description = "Nightly <GPU>".to_string();
        let page = render_with_template(
            "<h1>{{ description }}</h1><p>{{ date }}</p>{{ matrix }}",
            &spec,
            "today",
        );
        assert!(page.starts_with("<h1>Nightly &lt;GPU&gt;</h1><p>today</p><section"));
    }

    #[test]
    fn template_values_are_not_expanded_again() {
        let mut spec = MatricesSpec::new().with_matrix("gpu", matrix());
        spec.description = "see {{ matrix }} at {{ date }}".to_string();
        let page = render_with_template("<h1>{{ description }}</h1>{{ matrix }}", &spec, "today");

        assert!(page.starts_with("<h1>see {{ matrix }} at {{ date }}</h1><section"));
        assert_eq!(page.matches("<section").count(), 1);
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let spec = MatricesSpec::new().with_matrix("gpu", matrix());
        assert_eq!(render_with_template("<p>{{ other }}</p>", &spec, "today"), "<p>{{ other }}</p>");
    }
}
