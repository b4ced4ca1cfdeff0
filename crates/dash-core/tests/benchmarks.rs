//! GPU burn log export against an in-memory artifact store

use dash_core::benchmarks::{export_gpu_burn_logs_with, ExportSummary};
use dash_core::resolver::resolve_matrices_with;
use dash_core::{ExportError, MatricesSpec, MatrixSpec, TestSpec};
use dash_test_utils::{ansible_log, finished_json, fixture_fetcher, ListingPage, StaticOrigin};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const PROW: &str = "periodic-ci-master-e2e";
const BURN_STEP: &str = "003__gpu_operator__run_gpu_burn";

fn step_dir(build: &str) -> String {
    format!("{PROW}/{build}/artifacts/e2e/gpu-operator-e2e")
}

fn spec() -> MatricesSpec {
    let matrix = MatrixSpec::new(dash_test_utils::BASE_URL, "/unused")
        .with_prow_config("periodic-ci")
        .with_prow_step("gpu-operator-e2e")
        .with_test("4.15|Master", TestSpec::new("e2e", "master"));
    MatricesSpec::new().with_test_history(3).with_matrix("gpu", matrix)
}

/// Build 3 has a log, build 2's burn step is unreachable, build 1 never burned
fn store() -> StaticOrigin {
    let mut origin = StaticOrigin::new();
    origin.insert_listing(PROW, &ListingPage::new().dirs(["1", "2", "3"]));
    for build in ["1", "2", "3"] {
        origin.insert(&format!("{PROW}/{build}/finished.json"), finished_json(true, "SUCCESS", 1_700_000_000));
    }

    let artifacts = format!("{}/artifacts", step_dir("3"));
    origin.insert_listing(&artifacts, &ListingPage::new().dir("000__deploy").dir(BURN_STEP));
    origin.insert(&format!("{artifacts}/000__deploy/_ansible.log.json"), ansible_log(3, 0, 0));
    origin.insert_listing(
        &format!("{artifacts}/{BURN_STEP}"),
        &ListingPage::new()
            .file("_ansible.log.json")
            .file("gpu_burn.yaml")
            .file("gpu_burn.node-a.log")
            .file("gpu_burn.node-b.log"),
    );
    origin.insert(&format!("{artifacts}/{BURN_STEP}/gpu_burn.node-a.log"), "GPU 0: OK (1234 Gflop/s)\n");

    let artifacts = format!("{}/artifacts", step_dir("2"));
    origin.insert_listing(&artifacts, &ListingPage::new().dir(BURN_STEP));
    origin.fail(&format!("{artifacts}/{BURN_STEP}/"));

    origin.insert_listing(&format!("{}/artifacts", step_dir("1")), &ListingPage::new().dir("000__deploy"));
    origin
}

fn resolved(dirs: &mut Vec<TempDir>) -> MatricesSpec {
    let mut spec = spec();
    resolve_matrices_with(&mut spec, None, |_, _| {
        let (fetcher, dir) = fixture_fetcher(store());
        dirs.push(dir);
        Ok(fetcher)
    })
    .unwrap();
    spec
}

#[test]
fn resolution_lists_every_step_directory() {
    let mut dirs = Vec::new();
    let spec = resolved(&mut dirs);

    let history = &spec.matrices["gpu"].tests["4.15|Master"][0].history;
    let ids: Vec<&str> = history.iter().map(|r| r.build_id.as_str()).collect();
    assert_eq!(ids, vec!["3", "2", "1"]);
    assert_eq!(history[0].toolbox_step_dirs, vec!["000__deploy".to_string(), BURN_STEP.to_string()]);
    // Steps without a toolbox log are listed but carry no stats.
    let steps: Vec<&str> = history[0].toolbox_steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(steps, vec!["000__deploy"]);
}

#[test]
fn exports_first_log_and_skips_the_rest() {
    let mut dirs = Vec::new();
    let spec = resolved(&mut dirs);
    let out = tempfile::tempdir().unwrap();

    let summary = export_gpu_burn_logs_with(&spec, out.path(), |_, _| {
        let (fetcher, dir) = fixture_fetcher(store());
        dirs.push(dir);
        Ok(fetcher)
    })
    .unwrap();

    assert_eq!(
        summary,
        ExportSummary {
            exported: 1,
            missing: 1,
            failed: 1,
        }
    );
    let exported = out.path().join(PROW).join("3").join("gpu-burn").join("pod.log");
    assert_eq!(fs::read_to_string(exported).unwrap(), "GPU 0: OK (1234 Gflop/s)\n");
    assert!(!out.path().join(PROW).join("2").exists());
    assert!(!out.path().join(PROW).join("1").exists());
}

#[test]
fn unwritable_output_is_fatal() {
    let mut dirs = Vec::new();
    let spec = resolved(&mut dirs);
    let out = tempfile::tempdir().unwrap();
    let blocker = out.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();

    let err = export_gpu_burn_logs_with(&spec, &blocker, |_, _| {
        let (fetcher, dir) = fixture_fetcher(store());
        dirs.push(dir);
        Ok(fetcher)
    })
    .unwrap_err();

    assert!(matches!(err, ExportError::Write { ref path, .. } if path.ends_with("3/gpu-burn/pod.log")));
}
