//! Simulator launchers and the spec-run environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Configuration;
use crate::error::{Error, Result};

use super::xcode::SIMULATOR_PLATFORM;
use super::CommandDescriptor;

/// Reporter that prints spec progress to the console.
pub const DEFAULT_REPORTER: &str = "CDRDefaultReporter";

/// Reporter that writes a JUnit XML file.
pub const JUNIT_REPORTER: &str = "CDRJUnitXMLReporter";

/// Processes stopped when shutting the simulator down.
pub const SIMULATOR_PROCESSES: &[&str] = &["gdb", "otest", "iPhone Simulator"];

/// Launcher file names and the grammar each one speaks.
pub const KNOWN_LAUNCHERS: &[(&str, LauncherKind)] = &[
    ("waxsim", LauncherKind::Waxsim),
    ("ios-sim", LauncherKind::IosSim),
];

/// Argument grammar of a simulator launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherKind {
    Waxsim,
    IosSim,
}

/// A configured simulator launcher binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// `waxsim -s <sdk> -f <device> -e K=V ... <app>`
    Waxsim(PathBuf),
    /// `ios-sim launch <app> --sdk <sdk> --family <device> --setenv K=V ...`
    IosSim(PathBuf),
}

impl Launcher {
    /// Selects the launcher grammar from the binary's file name.
    pub fn from_binary(binary: PathBuf) -> Result<Self> {
        let kind = binary
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| {
                KNOWN_LAUNCHERS
                    .iter()
                    .find(|(known, _)| *known == name)
                    .map(|(_, kind)| *kind)
            });

        match kind {
            Some(LauncherKind::Waxsim) => Ok(Launcher::Waxsim(binary)),
            Some(LauncherKind::IosSim) => Ok(Launcher::IosSim(binary)),
            None => Err(Error::UnknownLauncherBinary(binary)),
        }
    }

    pub fn kind(&self) -> LauncherKind {
        match self {
            Launcher::Waxsim(_) => LauncherKind::Waxsim,
            Launcher::IosSim(_) => LauncherKind::IosSim,
        }
    }

    pub fn binary(&self) -> &Path {
        match self {
            Launcher::Waxsim(path) | Launcher::IosSim(path) => path,
        }
    }
}

/// Runtime parameters for a spec run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecRun<'a> {
    /// Spec bundle target, a key of `spec_targets`.
    pub target: &'a str,
    /// Build configuration the bundle was built with.
    pub configuration: &'a str,
    /// Simulator SDK version.
    pub sdk: &'a str,
}

/// A synthesized spec run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecInvocation {
    /// The launcher command.
    pub command: CommandDescriptor,
    /// File the launcher sends the app's streams to, when it does not forward them.
    pub app_output: Option<PathBuf>,
    /// JUnit report the run is expected to write.
    pub report: Option<PathBuf>,
}

/// Environment handed to the app under test.
pub fn spec_environment(config: &Configuration, target: &str) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();

    env.insert("CEDAR_HEADLESS_SPECS".to_string(), "1".to_string());

    let reporters = match config.spec_reports_dir() {
        Some(_) => format!("{},{}", DEFAULT_REPORTER, JUNIT_REPORTER),
        None => DEFAULT_REPORTER.to_string(),
    };
    env.insert("CEDAR_REPORTER_CLASS".to_string(), reporters);

    if let Some(home) = config.spec_user_home() {
        env.insert("CFFIXED_USER_HOME".to_string(), home.display().to_string());
    }

    if let Some(report) = config.spec_report_path(target) {
        env.insert(
            "CEDAR_JUNIT_XML_FILE".to_string(),
            report.display().to_string(),
        );
    }

    if let Some(opts) = config.spec_reporter_opts() {
        env.insert("CEDAR_REPORTER_OPTS".to_string(), opts.to_string());
    }

    env
}

/// Builds the launcher command for a spec run.
///
/// Fails when no launcher is configured or the target is not one of the
/// configured `spec_targets`.
pub fn spec_invocation(config: &Configuration, run: &SpecRun<'_>) -> Result<SpecInvocation> {
    let launcher = config
        .launcher()
        .ok_or_else(|| Error::Config("no sim_binary configured".to_string()))?;

    let target = config.spec_target(run.target).ok_or_else(|| {
        Error::Config(format!("'{}' is not listed in spec_targets", run.target))
    })?;

    let app = config
        .products_dir(run.configuration, SIMULATOR_PLATFORM)
        .join(format!("{}.app", run.target));
    let app = app.display().to_string();
    let env = spec_environment(config, run.target);
    let label = format!("{}-{}", run.target, run.configuration);

    let mut command = CommandDescriptor::new(launcher.binary().display().to_string());
    let mut app_output = None;

    match launcher.kind() {
        LauncherKind::Waxsim => {
            command = command.args(["-s", run.sdk, "-f", target.device.as_str()]);
            for (key, value) in &env {
                command = command.arg("-e").arg(format!("{}={}", key, value));
            }
            command = command.arg(app);
        }
        LauncherKind::IosSim => {
            command = command
                .args(["launch", app.as_str()])
                .args(["--sdk", run.sdk, "--family", target.device.as_str()])
                .args(["--retina", "--tall"]);
            for (key, value) in &env {
                command = command.arg("--setenv").arg(format!("{}={}", key, value));
            }
            let output = config.log_file(&format!("{}-simulator", label));
            let path = output.display().to_string();
            command = command.args(["--stdout", path.as_str(), "--stderr", path.as_str()]);
            app_output = Some(output);
        }
    }

    let command = command
        .current_dir(config.project_root())
        .log_to(config.log_file(&format!("{}-specs", label)));

    Ok(SpecInvocation {
        command,
        app_output,
        report: config.spec_report_path(run.target),
    })
}

/// Force-kills a simulator-related process by name.
pub fn kill_process(name: &str) -> CommandDescriptor {
    CommandDescriptor::new("killall")
        .args(["-m", "-KILL", name])
        .quiet()
}

/// Directory holding the simulator's installed apps and settings.
pub fn simulator_data_dir(home: &Path) -> PathBuf {
    home.join("Library")
        .join("Application Support")
        .join("iPhone Simulator")
}
