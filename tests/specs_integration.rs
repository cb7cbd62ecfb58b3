//! End-to-end spec runs through a fake `waxsim` launcher.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use thrust::{Configuration, Orchestrator, Outcome, Overrides, SpecRun};

/// Writes an executable `waxsim` that echoes its `-e` variables and prints `body`.
///
/// When `write_report` is set the script creates the JUnit file named by
/// `CEDAR_JUNIT_XML_FILE`.
fn fake_waxsim(bin_dir: &Path, body: &str, write_report: bool) -> PathBuf {
    let report = if write_report {
        r#"[ -n "$report" ] && echo '<testsuite/>' > "$report""#
    } else {
        ":"
    };
    let script = format!(
        r#"#!/bin/sh
report=""
while [ $# -gt 0 ]; do
  case "$1" in
    -e)
      echo "env $2"
      case "$2" in
        CEDAR_JUNIT_XML_FILE=*) report="${{2#CEDAR_JUNIT_XML_FILE=}}" ;;
      esac
      shift 2
      ;;
    *)
      shift
      ;;
  esac
done
{report}
{body}
"#
    );

    std::fs::create_dir_all(bin_dir).unwrap();
    let path = bin_dir.join("waxsim");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn project(root: &Path, launcher: &Path, reports: bool) -> Orchestrator {
    let mut yaml = format!(
        "project_name: MyApp\nthrust_version: 0.1\nsim_binary: {}\nspec_targets:\n  MyAppSpecs: {{}}\n",
        launcher.display()
    );
    if reports {
        yaml.push_str("spec_reports_dir: reports\n");
    }
    std::fs::write(root.join("thrust.yml"), yaml).unwrap();

    let config = Configuration::discover(root, Overrides::default()).unwrap();
    Orchestrator::new(config)
}

fn run() -> SpecRun<'static> {
    SpecRun {
        target: "MyAppSpecs",
        configuration: "Debug",
        sdk: "6.1",
    }
}

#[test]
fn passing_run_is_success_and_logged() {
    let dir = TempDir::new().unwrap();
    let launcher = fake_waxsim(&dir.path().join("bin"), "echo Finished", false);
    let orchestrator = project(dir.path(), &launcher, false);

    let result = orchestrator.run_specs(&run()).unwrap();

    assert_eq!(result.outcome(), Outcome::Success);
    assert!(result.captured_output().contains("env CEDAR_HEADLESS_SPECS=1"));
    assert!(result
        .captured_output()
        .contains("env CEDAR_REPORTER_CLASS=CDRDefaultReporter"));

    let log = dir.path().join("build").join("MyAppSpecs-Debug-specs.output");
    assert_eq!(result.artifact_path(), Some(log.as_path()));
    assert_eq!(
        std::fs::read_to_string(&log).unwrap(),
        result.captured_output()
    );
}

#[test]
fn failure_on_stderr_is_captured() {
    let dir = TempDir::new().unwrap();
    let launcher = fake_waxsim(
        &dir.path().join("bin"),
        "echo 'FAILURE: 1 test' 1>&2\necho Finished",
        false,
    );
    let orchestrator = project(dir.path(), &launcher, false);

    let result = orchestrator.run_specs(&run()).unwrap();

    assert_eq!(result.outcome(), Outcome::Failure);
    assert!(result.captured_output().contains("FAILURE: 1 test"));
}

#[test]
fn crash_without_finish_marker_is_failure() {
    let dir = TempDir::new().unwrap();
    let launcher = fake_waxsim(&dir.path().join("bin"), "echo Running...\nexit 0", false);
    let orchestrator = project(dir.path(), &launcher, false);

    assert_eq!(
        orchestrator.run_specs(&run()).unwrap().outcome(),
        Outcome::Failure
    );
}

#[test]
fn written_report_keeps_success() {
    let dir = TempDir::new().unwrap();
    let launcher = fake_waxsim(&dir.path().join("bin"), "echo Finished", true);
    let orchestrator = project(dir.path(), &launcher, true);

    let result = orchestrator.run_specs(&run()).unwrap();

    let report = dir.path().join("reports").join("MyAppSpecs.xml");
    assert_eq!(result.outcome(), Outcome::Success);
    assert_eq!(result.report_path(), Some(report.as_path()));
    assert!(report.exists());
    assert!(result
        .captured_output()
        .contains("CDRDefaultReporter,CDRJUnitXMLReporter"));
}

#[test]
fn missing_report_forces_failure_even_with_stale_file() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("reports").join("MyAppSpecs.xml");
    std::fs::create_dir_all(report.parent().unwrap()).unwrap();
    std::fs::write(&report, "<testsuite name=\"yesterday\"/>").unwrap();

    let launcher = fake_waxsim(&dir.path().join("bin"), "echo Finished", false);
    let orchestrator = project(dir.path(), &launcher, true);

    let result = orchestrator.run_specs(&run()).unwrap();

    assert_eq!(result.outcome(), Outcome::Failure);
    assert!(!report.exists());
}

#[test]
fn non_zero_launcher_exit_is_not_consulted() {
    let dir = TempDir::new().unwrap();
    let launcher = fake_waxsim(&dir.path().join("bin"), "echo Finished\nexit 3", false);
    let orchestrator = project(dir.path(), &launcher, false);

    assert!(orchestrator.run_specs(&run()).unwrap().is_success());
}

#[test]
fn ci_override_moves_spec_log() {
    let dir = TempDir::new().unwrap();
    let artifacts = TempDir::new().unwrap();
    let launcher = fake_waxsim(&dir.path().join("bin"), "echo Finished", false);
    std::fs::write(
        dir.path().join("thrust.yml"),
        format!(
            "project_name: MyApp\nthrust_version: 0.1\nsim_binary: {}\nspec_targets:\n  MyAppSpecs:\n",
            launcher.display()
        ),
    )
    .unwrap();

    let config = Configuration::discover(
        dir.path(),
        Overrides::default().with_ci_artifacts_dir(artifacts.path()),
    )
    .unwrap();
    let result = Orchestrator::new(config).run_specs(&run()).unwrap();

    let log = artifacts.path().join("MyAppSpecs-Debug-specs.output");
    assert_eq!(result.artifact_path(), Some(log.as_path()));
    assert!(log.exists());
    assert!(!dir.path().join("build").exists());
}
