//! xcodebuild, xcrun, agvtool and xcode-select invocations.

use std::path::Path;

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::version::Version;

use super::CommandDescriptor;

/// Platform directory suffix for device builds.
pub const DEVICE_PLATFORM: &str = "iphoneos";

/// Platform directory suffix for simulator builds.
pub const SIMULATOR_PLATFORM: &str = "iphonesimulator";

/// Diagnostic line xcodebuild emits on every run and that carries no information.
pub const NOISY_LINE: &str = "backing file";

/// The xcodebuild action sequence to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XcodeAction {
    Clean,
    CleanBuild,
}

impl XcodeAction {
    fn words(&self) -> &'static [&'static str] {
        match self {
            XcodeAction::Clean => &["clean"],
            XcodeAction::CleanBuild => &["clean", "build"],
        }
    }

    /// Label used in log artifact names.
    pub fn label(&self) -> &'static str {
        match self {
            XcodeAction::Clean => "clean",
            XcodeAction::CleanBuild => "clean_build",
        }
    }
}

/// Runtime parameters for a clean or build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildRequest<'a> {
    /// Build configuration, e.g. `Debug` or `Release`.
    pub configuration: &'a str,
    /// SDK selector, e.g. `iphonesimulator`.
    pub sdk: Option<&'a str>,
    /// Target (project mode) or scheme (workspace mode). `None` builds all targets.
    pub target: Option<&'a str>,
}

impl<'a> BuildRequest<'a> {
    pub fn new(configuration: &'a str) -> Self {
        Self {
            configuration,
            sdk: None,
            target: None,
        }
    }

    pub fn with_sdk(mut self, sdk: &'a str) -> Self {
        self.sdk = Some(sdk);
        self
    }

    pub fn with_target(mut self, target: &'a str) -> Self {
        self.target = Some(target);
        self
    }

    /// Log label: `[<target>-]<configuration>-<action>`.
    pub fn log_label(&self, action: XcodeAction) -> String {
        match self.target {
            Some(target) => format!("{}-{}-{}", target, self.configuration, action.label()),
            None => format!("{}-{}", self.configuration, action.label()),
        }
    }
}

/// Builds the xcodebuild invocation for a clean or clean+build.
///
/// Workspace mode (`-workspace`/`-scheme`) is used only when the
/// configuration asks for it and a target is given; otherwise the project
/// file is addressed with `-target` or `-alltargets`.
pub fn xcodebuild(
    config: &Configuration,
    action: XcodeAction,
    request: &BuildRequest<'_>,
) -> CommandDescriptor {
    let name = config.project_name();
    let mut cmd = CommandDescriptor::new("xcodebuild");

    cmd = match request.target {
        Some(target) if config.use_workspace() => cmd.args([
            "-workspace".to_string(),
            format!("{}.xcworkspace", name),
            "-scheme".to_string(),
            target.to_string(),
        ]),
        Some(target) => cmd.args([
            "-project".to_string(),
            format!("{}.xcodeproj", name),
            "-target".to_string(),
            target.to_string(),
        ]),
        None => cmd.args([
            "-project".to_string(),
            format!("{}.xcodeproj", name),
            "-alltargets".to_string(),
        ]),
    };

    cmd = cmd.args(["-configuration", request.configuration]);
    if let Some(sdk) = request.sdk {
        cmd = cmd.args(["-sdk", sdk]);
    }

    cmd.args(action.words().iter().copied())
        .arg(format!("SYMROOT={}", config.build_dir().display()))
        .current_dir(config.project_root())
        .suppress_lines_containing(NOISY_LINE)
        .log_to(config.log_file(&request.log_label(action)))
}

/// Lists the project's build configurations.
pub fn list_project(config: &Configuration) -> CommandDescriptor {
    CommandDescriptor::new("xcodebuild")
        .args([
            "-project".to_string(),
            format!("{}.xcodeproj", config.project_name()),
            "-list".to_string(),
        ])
        .current_dir(config.project_root())
        .quiet()
}

/// Extracts the `Build Configurations:` section from `xcodebuild -list` output.
pub fn parse_build_configurations(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| line.trim() != "Build Configurations:")
        .skip(1)
        .map(str::trim)
        .take_while(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns the name of the single `.app` bundle in `products_dir`.
pub fn find_app_name(products_dir: &Path) -> Result<String> {
    let entries = match std::fs::read_dir(products_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NoBuildProduct {
                dir: products_dir.to_path_buf(),
                found: 0,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut apps = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "app") {
            if let Some(stem) = path.file_stem() {
                apps.push(stem.to_string_lossy().into_owned());
            }
        }
    }

    match apps.as_slice() {
        [app] => Ok(app.clone()),
        _ => Err(Error::NoBuildProduct {
            dir: products_dir.to_path_buf(),
            found: apps.len(),
        }),
    }
}

/// Signs and wraps `<app_name>.app` into `<app_name>.ipa` next to it.
pub fn package_application(
    products_dir: &Path,
    app_name: &str,
    identity: &str,
) -> CommandDescriptor {
    let app = products_dir.join(format!("{}.app", app_name));
    let ipa = products_dir.join(format!("{}.ipa", app_name));

    CommandDescriptor::new("xcrun")
        .args(["-sdk", DEVICE_PLATFORM, "PackageApplication", "-v"])
        .arg(app.display().to_string())
        .arg("-o")
        .arg(ipa.display().to_string())
        .args(["--sign", identity])
}

/// Prints the active developer directory.
pub fn developer_dir() -> CommandDescriptor {
    CommandDescriptor::new("xcode-select")
        .arg("-print-path")
        .quiet()
}

/// Reads the marketing version of the project in `project_root`.
pub fn what_marketing_version(project_root: &Path) -> CommandDescriptor {
    CommandDescriptor::new("agvtool")
        .args(["what-marketing-version", "-terse"])
        .current_dir(project_root)
        .quiet()
}

/// Sets the build version.
pub fn new_version(project_root: &Path, version: &Version) -> CommandDescriptor {
    CommandDescriptor::new("agvtool")
        .arg("new-version")
        .arg(version.to_string())
        .current_dir(project_root)
}

/// Sets the marketing version to `version` as written.
pub fn new_marketing_version(project_root: &Path, version: &str) -> CommandDescriptor {
    CommandDescriptor::new("agvtool")
        .arg("new-marketing-version")
        .arg(version)
        .current_dir(project_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::OutputSink;
    use crate::config::RawConfig;
    use crate::overrides::Overrides;
    use tempfile::TempDir;

    fn config(use_workspace: bool) -> Configuration {
        let raw = RawConfig {
            project_name: "MyApp".to_string(),
            thrust_version: Some(0.1),
            use_workspace,
            ..Default::default()
        };
        Configuration::load("/work/myapp", raw, Overrides::default()).unwrap()
    }

    #[test]
    fn project_mode_without_target_builds_all_targets() {
        let cmd = xcodebuild(&config(false), XcodeAction::Clean, &BuildRequest::new("Debug"));

        assert_eq!(cmd.program, "xcodebuild");
        assert_eq!(
            cmd.args,
            vec![
                "-project",
                "MyApp.xcodeproj",
                "-alltargets",
                "-configuration",
                "Debug",
                "clean",
                "SYMROOT=/work/myapp/build",
            ]
        );
        assert_eq!(
            cmd.sink,
            OutputSink::File("/work/myapp/build/Debug-clean.output".into())
        );
        assert_eq!(cmd.suppressed_lines, vec![NOISY_LINE]);
    }

    #[test]
    fn project_mode_with_target_and_sdk() {
        let request = BuildRequest::new("Release")
            .with_target("MyApp")
            .with_sdk("iphoneos");
        let cmd = xcodebuild(&config(false), XcodeAction::CleanBuild, &request);

        assert_eq!(
            cmd.args,
            vec![
                "-project",
                "MyApp.xcodeproj",
                "-target",
                "MyApp",
                "-configuration",
                "Release",
                "-sdk",
                "iphoneos",
                "clean",
                "build",
                "SYMROOT=/work/myapp/build",
            ]
        );
        assert_eq!(
            cmd.log_file(),
            Some(Path::new("/work/myapp/build/MyApp-Release-clean_build.output"))
        );
    }

    #[test]
    fn workspace_mode_requires_a_target() {
        let with_target = xcodebuild(
            &config(true),
            XcodeAction::CleanBuild,
            &BuildRequest::new("Debug").with_target("MyAppSpecs"),
        );
        assert_eq!(
            &with_target.args[..4],
            &["-workspace", "MyApp.xcworkspace", "-scheme", "MyAppSpecs"]
        );

        let without_target =
            xcodebuild(&config(true), XcodeAction::Clean, &BuildRequest::new("Debug"));
        assert_eq!(
            &without_target.args[..3],
            &["-project", "MyApp.xcodeproj", "-alltargets"]
        );
    }

    #[test]
    fn build_runs_from_project_root() {
        let cmd = xcodebuild(&config(false), XcodeAction::Clean, &BuildRequest::new("Debug"));
        assert_eq!(cmd.current_dir.as_deref(), Some(Path::new("/work/myapp")));
    }

    #[test]
    fn ci_mode_redirects_logs() {
        let raw = RawConfig {
            project_name: "MyApp".to_string(),
            thrust_version: Some(0.1),
            ..Default::default()
        };
        let config = Configuration::load(
            "/work/myapp",
            raw,
            Overrides::default().with_ci_artifacts_dir("/ci/out"),
        )
        .unwrap();

        let cmd = xcodebuild(&config, XcodeAction::Clean, &BuildRequest::new("Debug"));
        assert_eq!(cmd.log_file(), Some(Path::new("/ci/out/Debug-clean.output")));
        // Products still land in the project's build directory.
        assert!(cmd.args.contains(&"SYMROOT=/work/myapp/build".to_string()));
    }

    #[test]
    fn parses_build_configurations_section() {
        let output = r#"Information about project "MyApp":
    Targets:
        MyApp
        MyAppSpecs

    Build Configurations:
        Debug
        Release
        AdHoc

    If no build configuration is specified and -scheme is not passed then "Release" is used.
"#;
        assert_eq!(
            parse_build_configurations(output),
            vec!["Debug", "Release", "AdHoc"]
        );
    }

    #[test]
    fn missing_configurations_section_is_empty() {
        assert!(parse_build_configurations("xcodebuild: error: no project").is_empty());
    }

    #[test]
    fn finds_single_app_bundle() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("MyApp.app")).unwrap();
        std::fs::create_dir(dir.path().join("MyApp.app.dSYM")).unwrap();

        assert_eq!(find_app_name(dir.path()).unwrap(), "MyApp");
    }

    #[test]
    fn no_app_bundle_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = find_app_name(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoBuildProduct { found: 0, .. }));
    }

    #[test]
    fn missing_products_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = find_app_name(&dir.path().join("Release-iphoneos")).unwrap_err();
        assert!(matches!(err, Error::NoBuildProduct { found: 0, .. }));
    }

    #[test]
    fn ambiguous_app_bundles_are_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("MyApp.app")).unwrap();
        std::fs::create_dir(dir.path().join("MyAppLite.app")).unwrap();

        let err = find_app_name(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoBuildProduct { found: 2, .. }));
    }

    #[test]
    fn package_command_signs_with_identity() {
        let cmd = package_application(
            Path::new("/work/myapp/build/Release-iphoneos"),
            "MyApp",
            "iPhone Distribution: Example Co",
        );
        assert_eq!(cmd.program, "xcrun");
        assert_eq!(
            cmd.args,
            vec![
                "-sdk",
                "iphoneos",
                "PackageApplication",
                "-v",
                "/work/myapp/build/Release-iphoneos/MyApp.app",
                "-o",
                "/work/myapp/build/Release-iphoneos/MyApp.ipa",
                "--sign",
                "iPhone Distribution: Example Co",
            ]
        );
    }

    #[test]
    fn agvtool_commands() {
        let root = Path::new("/work/myapp");
        assert_eq!(
            what_marketing_version(root).to_string(),
            "agvtool what-marketing-version -terse"
        );
        assert_eq!(
            new_version(root, &Version::new(1, 3, 0)).to_string(),
            "agvtool new-version 1.3.0"
        );
        assert_eq!(
            new_marketing_version(root, "2.0").to_string(),
            "agvtool new-marketing-version 2.0"
        );
    }
}
