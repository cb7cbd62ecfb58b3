//! Environment-driven switches that alter behavior without touching thrust.yml.
//!
//! Environment variables:
//! - `IGNORE_GIT` - Skip the clean-working-tree and branch-sync guards
//! - `IS_CI_BOX` - Write command logs to `CC_BUILD_ARTIFACTS` instead of the build directory
//!
//! The switches are read once at startup and carried inside the
//! [`Configuration`](crate::config::Configuration).

use std::path::PathBuf;

/// Process-wide switches collected from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Skip git cleanliness and synchronization checks.
    pub ignore_git: bool,
    /// Directory receiving command logs on a CI box.
    pub ci_artifacts_dir: Option<PathBuf>,
}

impl Overrides {
    /// Loads the switches from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the switches through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let ignore_git = lookup("IGNORE_GIT").is_some();

        let ci_artifacts_dir = if lookup("IS_CI_BOX").is_some() {
            match lookup("CC_BUILD_ARTIFACTS").filter(|dir| !dir.trim().is_empty()) {
                Some(dir) => Some(PathBuf::from(dir)),
                None => {
                    tracing::warn!(
                        "IS_CI_BOX is set but CC_BUILD_ARTIFACTS is not, logging to the build directory"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            ignore_git,
            ci_artifacts_dir,
        }
    }

    /// Enables the git bypass.
    pub fn with_ignore_git(mut self, ignore_git: bool) -> Self {
        self.ignore_git = ignore_git;
        self
    }

    /// Routes command logs to the given directory.
    pub fn with_ci_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ci_artifacts_dir = Some(dir.into());
        self
    }
}
