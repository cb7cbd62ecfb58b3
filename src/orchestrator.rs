//! Operation entry points: clean, build, package, specs and version bumps.
//!
//! Each operation synthesizes its commands from the loaded configuration and
//! the caller's runtime parameters, then runs them one at a time.

use std::path::Path;

use crate::classify::ExecutionResult;
use crate::commands::simulator::{self, SpecRun, SIMULATOR_PROCESSES};
use crate::commands::xcode::{self, BuildRequest, XcodeAction, DEVICE_PLATFORM};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::executor::{CommandOutput, CommandRunner, Executor, SystemRunner};
use crate::release::ReleaseWorkflow;
use crate::version::{parse_marketing_version, Release, Version};

/// Runs project operations against one immutable configuration.
pub struct Orchestrator<R = SystemRunner> {
    config: Configuration,
    executor: Executor<R>,
}

impl Orchestrator<SystemRunner> {
    /// Creates an orchestrator that spawns real processes.
    pub fn new(config: Configuration) -> Self {
        Self::with_runner(config, SystemRunner)
    }
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn with_runner(config: Configuration, runner: R) -> Self {
        Self {
            config,
            executor: Executor::new(runner),
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn executor(&self) -> &Executor<R> {
        &self.executor
    }

    /// Cleans the requested target, or all targets.
    pub fn clean(&self, request: &BuildRequest<'_>) -> Result<CommandOutput> {
        let cmd = xcode::xcodebuild(&self.config, XcodeAction::Clean, request);
        self.executor.run_checked(&cmd)
    }

    /// Cleans and builds the requested target, or all targets.
    pub fn build(&self, request: &BuildRequest<'_>) -> Result<CommandOutput> {
        let cmd = xcode::xcodebuild(&self.config, XcodeAction::CleanBuild, request);
        self.executor.run_checked(&cmd)
    }

    /// Build configurations declared by the project file.
    pub fn build_configurations(&self) -> Result<Vec<String>> {
        let output = self
            .executor
            .run_checked(&xcode::list_project(&self.config))?;
        Ok(xcode::parse_build_configurations(&output.output))
    }

    /// Signs and packages the device build of `configuration` into an `.ipa`.
    ///
    /// Requires exactly one `.app` bundle in the products directory.
    pub fn package(&self, configuration: &str) -> Result<CommandOutput> {
        let products = self.config.products_dir(configuration, DEVICE_PLATFORM);
        let app_name = xcode::find_app_name(&products)?;

        let identity = self
            .config
            .identity()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::Config("no signing identity configured".to_string()))?;

        tracing::info!(app = %app_name, identity = %identity, "packaging");
        self.executor
            .run_checked(&xcode::package_application(&products, &app_name, identity))
    }

    /// Runs a spec bundle in the simulator and classifies its output.
    ///
    /// The launcher's exit status is not consulted. A configured JUnit
    /// report that is missing after the run forces a failure.
    pub fn run_specs(&self, run: &SpecRun<'_>) -> Result<ExecutionResult> {
        let invocation = simulator::spec_invocation(&self.config, run)?;

        if let Some(report) = &invocation.report {
            remove_file_if_exists(report)?;
            if let Some(parent) = report.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if let Some(app_output) = &invocation.app_output {
            remove_file_if_exists(app_output)?;
        }

        let mut output = self.executor.capture(&invocation.command)?;

        if let Some(app_output) = &invocation.app_output {
            match std::fs::read_to_string(app_output) {
                Ok(text) => output.append(&text)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %app_output.display(), "launcher wrote no app output");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let result = ExecutionResult::classify(output, invocation.report.as_deref());
        tracing::info!(
            spec_target = %run.target,
            outcome = ?result.outcome(),
            "spec run finished"
        );
        Ok(result)
    }

    /// Force-kills simulator processes. Processes that are not running are ignored.
    pub fn kill_simulator(&self) -> Result<()> {
        for name in SIMULATOR_PROCESSES {
            self.executor.run_unchecked(&simulator::kill_process(name))?;
        }
        Ok(())
    }

    /// Removes the simulator's data directory under `home`.
    ///
    /// Returns whether anything was removed.
    pub fn reset_simulator(&self, home: &Path) -> Result<bool> {
        let dir = simulator::simulator_data_dir(home);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!(path = %dir.display(), "removed simulator data");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Active Xcode developer directory.
    pub fn developer_dir(&self) -> Result<String> {
        let output = self.executor.run_checked(&xcode::developer_dir())?;
        Ok(output.output.trim().to_string())
    }

    /// Current marketing version of the project.
    pub fn marketing_version(&self) -> Result<Version> {
        let output = self
            .executor
            .run_checked(&xcode::what_marketing_version(self.config.project_root()))?;
        parse_marketing_version(&output.output)
    }

    /// Bumps the project version and publishes it through the release workflow.
    ///
    /// The git guards are skipped when the configuration's overrides ask for it.
    pub fn bump_version(&self, release: Release) -> Result<Version> {
        let root = self.config.project_root();
        let mut workflow =
            ReleaseWorkflow::new(&self.executor, root, self.config.overrides().ignore_git);

        workflow.run(|| {
            let next = self.marketing_version()?.bump(release)?;
            tracing::info!(version = %next, release = ?release, "applying version");
            self.executor.run_checked(&xcode::new_version(root, &next))?;
            Ok(next)
        })
    }

    /// Sets the marketing version without touching git.
    ///
    /// The text must match `major[.minor[.patch]]` and is handed to agvtool
    /// as given, so `3` stays `3`.
    pub fn set_marketing_version(&self, version: &str) -> Result<CommandOutput> {
        let version = version.trim();
        Version::parse(version)?;
        self.executor.run_checked(&xcode::new_marketing_version(
            self.config.project_root(),
            version,
        ))
    }
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
