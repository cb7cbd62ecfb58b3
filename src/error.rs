//! Error types for thrust operations.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for configuration, build, spec and release operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file predates the version this engine requires.
    #[error(
        "invalid configuration: your thrust.yml specifies version {configured}, \
         but thrust is at version {required}; update thrust_version in the configuration"
    )]
    ConfigTooOld { configured: f64, required: f64 },

    /// A version string did not match `major[.minor[.patch]]`.
    #[error("unknown version '{0}', it should match major.minor.patch")]
    MalformedVersion(String),

    /// The build product directory held zero or several application bundles.
    #[error("no build product found in {} ({found} .app bundles)", .dir.display())]
    NoBuildProduct { dir: PathBuf, found: usize },

    /// The configured simulator launcher is not one of the known launchers.
    #[error("unknown binary for running specs: '{}'", .0.display())]
    UnknownLauncherBinary(PathBuf),

    /// An external command exited unsuccessfully.
    #[error("command failed ({}): {command}", exit_code_label(.code))]
    ExternalCommandFailed { command: String, code: Option<i32> },

    /// The working tree has local modifications.
    #[error("working tree is not clean, commit or stash local changes first")]
    DirtyWorkingTree,

    /// The current branch differs from its remote-tracking branch.
    #[error("branch '{branch}' is not in sync with origin/{branch}")]
    BranchNotSynchronized { branch: String },

    /// Committing or pushing the release failed.
    #[error("failed to publish release: {reason}")]
    PublishFailed { reason: String, committed: bool },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error while reading configuration or writing artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Result type alias for thrust operations.
pub type Result<T> = std::result::Result<T, Error>;
