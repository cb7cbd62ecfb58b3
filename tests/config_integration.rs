//! Loading `thrust.yml` and `thrust.toml` from disk.

use std::path::Path;

use tempfile::TempDir;

use thrust::{Configuration, Error, LauncherKind, Overrides, DEFAULT_DEVICE};

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn version_zero_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "thrust.yml",
        "project_name: MyApp\nthrust_version: 0\n",
    );

    let err = Configuration::discover(dir.path(), Overrides::default()).unwrap_err();

    match err {
        Error::ConfigTooOld {
            configured,
            required,
        } => {
            assert_eq!(configured, 0.0);
            assert_eq!(required, 0.1);
        }
        other => panic!("Expected ConfigTooOld, got {:?}", other),
    }
}

#[test]
fn missing_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "thrust.yml", "project_name: MyApp\n");

    let err = Configuration::discover(dir.path(), Overrides::default()).unwrap_err();
    assert!(matches!(err, Error::ConfigTooOld { .. }));
}

#[test]
fn spec_target_without_device_gets_default() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "thrust.yml",
        r#"
project_name: MyApp
thrust_version: 0.1
sim_binary: /usr/local/bin/ios-sim
spec_targets:
  MyAppSpecs: {}
  MyAppUISpecs:
    device: ipad
"#,
    );

    let config = Configuration::discover(dir.path(), Overrides::default()).unwrap();

    assert_eq!(config.spec_target("MyAppSpecs").unwrap().device, DEFAULT_DEVICE);
    assert_eq!(config.spec_target("MyAppUISpecs").unwrap().device, "ipad");
    assert_eq!(config.launcher().unwrap().kind(), LauncherKind::IosSim);
    assert_eq!(config.build_dir(), dir.path().join("build"));
}

#[test]
fn unknown_launcher_is_rejected_at_load() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "thrust.yml",
        "project_name: MyApp\nthrust_version: 0.1\nsim_binary: /usr/bin/simctl\n",
    );

    let err = Configuration::discover(dir.path(), Overrides::default()).unwrap_err();
    assert!(matches!(err, Error::UnknownLauncherBinary(path) if path.ends_with("simctl")));
}

#[test]
fn explicit_toml_file() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "thrust.toml",
        r#"
project_name = "MyApp"
config_version = 0.2
build_dir = "out"

[spec_targets.MyAppSpecs]
"#,
    );

    let config = Configuration::from_file(
        dir.path(),
        dir.path().join("thrust.toml"),
        Overrides::default(),
    )
    .unwrap();

    assert_eq!(config.config_version(), 0.2);
    assert_eq!(config.build_dir(), dir.path().join("out"));
    assert_eq!(config.spec_target("MyAppSpecs").unwrap().device, DEFAULT_DEVICE);
}

#[test]
fn missing_file_names_the_path() {
    let dir = TempDir::new().unwrap();
    let err = Configuration::discover(dir.path(), Overrides::default()).unwrap_err();
    assert!(matches!(err, Error::Config(msg) if msg.contains("thrust.yml")));
}

#[test]
fn malformed_yaml_is_config_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "thrust.yml", "project_name: [unclosed\n");

    let err = Configuration::discover(dir.path(), Overrides::default()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
