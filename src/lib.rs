//! Thrust - build, package and spec-run orchestration for iOS projects
//!
//! This library loads a project's `thrust.yml`, synthesizes xcodebuild,
//! simulator and agvtool invocations from it, runs them synchronously while
//! capturing their output, and drives the guarded git workflow used to
//! publish version bumps.

pub mod classify;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod overrides;
pub mod release;
pub mod version;

pub use classify::{classify, classify_with_report, ExecutionResult, Outcome};
pub use commands::simulator::{Launcher, LauncherKind, SpecRun};
pub use commands::xcode::{BuildRequest, XcodeAction};
pub use commands::{CommandDescriptor, OutputSink};
pub use config::{
    Configuration, RawConfig, SpecTarget, Validate, ValidationResult, DEFAULT_CONFIG_FILE,
    DEFAULT_DEVICE, THRUST_VERSION,
};
pub use error::{Error, Result};
pub use executor::{CommandOutput, CommandRunner, Executor, ProcessOutput, SystemRunner};
pub use orchestrator::Orchestrator;
pub use overrides::Overrides;
pub use release::{ReleaseStage, ReleaseState, ReleaseWorkflow};
pub use version::{Release, Version};
