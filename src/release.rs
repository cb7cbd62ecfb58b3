//! Guarded release workflow: clean tree, synced branch, mutate, commit, push.
//!
//! The workflow is linear. Each step is a precondition for the next, and the
//! first failing step aborts the run without attempting the later ones.
//! Nothing is rolled back: a failed push leaves the local commit in place
//! and the error says so.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::commands::git;
use crate::error::{Error, Result};
use crate::executor::{CommandRunner, Executor};

/// A step of the release workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseStage {
    CleanlinessCheck,
    RemoteSync,
    Mutation,
    Publish,
}

/// Where a release workflow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseState {
    Idle,
    CleanlinessChecked,
    RemoteSynchronized,
    MutationApplied,
    Published,
    /// Terminated at the given stage.
    Aborted(ReleaseStage),
}

impl ReleaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReleaseState::Published | ReleaseState::Aborted(_))
    }

    /// The stage that runs next from this state.
    fn pending_stage(&self) -> ReleaseStage {
        match self {
            ReleaseState::Idle => ReleaseStage::CleanlinessCheck,
            ReleaseState::CleanlinessChecked => ReleaseStage::RemoteSync,
            ReleaseState::RemoteSynchronized => ReleaseStage::Mutation,
            ReleaseState::MutationApplied | ReleaseState::Published => ReleaseStage::Publish,
            ReleaseState::Aborted(stage) => *stage,
        }
    }
}

/// Drives one release through the git guards and publication.
pub struct ReleaseWorkflow<'a, R: CommandRunner> {
    executor: &'a Executor<R>,
    repo: PathBuf,
    skip_guards: bool,
    state: ReleaseState,
}

impl<'a, R: CommandRunner> ReleaseWorkflow<'a, R> {
    /// Creates a workflow for the repository at `repo`.
    ///
    /// With `skip_guards` the cleanliness and synchronization checks are
    /// bypassed with a warning.
    pub fn new(executor: &'a Executor<R>, repo: impl AsRef<Path>, skip_guards: bool) -> Self {
        Self {
            executor,
            repo: repo.as_ref().to_path_buf(),
            skip_guards,
            state: ReleaseState::Idle,
        }
    }

    pub fn state(&self) -> ReleaseState {
        self.state
    }

    /// Runs the workflow, applying `mutation` once both guards pass.
    ///
    /// The value returned by the mutation names the release in the commit
    /// message (`Changes version to <value>`) and is returned on success.
    pub fn run<T, F>(&mut self, mutation: F) -> Result<T>
    where
        T: fmt::Display,
        F: FnOnce() -> Result<T>,
    {
        if self.state != ReleaseState::Idle {
            return Err(Error::Config(format!(
                "release workflow already ran (state: {:?})",
                self.state
            )));
        }

        let result = self.drive(mutation);
        if let Err(e) = &result {
            let stage = self.state.pending_stage();
            tracing::error!(stage = ?stage, error = %e, "release aborted");
            self.state = ReleaseState::Aborted(stage);
        }
        result
    }

    fn drive<T, F>(&mut self, mutation: F) -> Result<T>
    where
        T: fmt::Display,
        F: FnOnce() -> Result<T>,
    {
        self.check_clean_working_tree()?;
        self.advance(ReleaseState::CleanlinessChecked);

        self.check_branch_synchronized()?;
        self.advance(ReleaseState::RemoteSynchronized);

        let value = mutation()?;
        self.advance(ReleaseState::MutationApplied);

        self.publish(&format!("Changes version to {}", value))?;
        self.advance(ReleaseState::Published);

        Ok(value)
    }

    fn advance(&mut self, state: ReleaseState) {
        tracing::debug!(from = ?self.state, to = ?state, "release state");
        self.state = state;
    }

    fn check_clean_working_tree(&self) -> Result<()> {
        if self.skip_guards {
            tracing::warn!("WARNING NOT CHECKING FOR CLEAN WORKING DIRECTORY");
            return Ok(());
        }

        tracing::info!("Checking for clean working tree...");
        self.executor.run_unchecked(&git::refresh_index(&self.repo))?;

        let diff = self.executor.capture(&git::diff_index_quiet(&self.repo))?;
        match diff.code {
            Some(0) => Ok(()),
            Some(1) => Err(Error::DirtyWorkingTree),
            code => Err(Error::ExternalCommandFailed {
                command: git::diff_index_quiet(&self.repo).to_string(),
                code,
            }),
        }
    }

    fn check_branch_synchronized(&self) -> Result<()> {
        if self.skip_guards {
            tracing::warn!("WARNING NOT CHECKING THAT THE BRANCH IS UP TO DATE");
            return Ok(());
        }

        let branch = self
            .executor
            .run_checked(&git::current_branch(&self.repo))?
            .output
            .trim()
            .to_string();
        tracing::info!("Checking that the {} branch is up to date...", branch);

        self.executor.run_checked(&git::fetch(&self.repo))?;

        let diff_cmd = git::diff_remote_quiet(&self.repo, &branch);
        let diff = self.executor.capture(&diff_cmd)?;
        match diff.code {
            Some(0) => Ok(()),
            Some(1) => Err(Error::BranchNotSynchronized { branch }),
            code => Err(Error::ExternalCommandFailed {
                command: diff_cmd.to_string(),
                code,
            }),
        }
    }

    fn publish(&self, message: &str) -> Result<()> {
        let commit = self
            .executor
            .capture(&git::commit_all(&self.repo, message))
            .map_err(|e| Error::PublishFailed {
                reason: format!("git commit failed: {}", e),
                committed: false,
            })?;
        if !commit.success() {
            return Err(Error::PublishFailed {
                reason: format!("git commit failed: {}", commit.output.trim()),
                committed: false,
            });
        }

        let push_failed = |detail: String| Error::PublishFailed {
            reason: format!(
                "git push failed, the commit '{}' exists locally but was not pushed: {}",
                message, detail
            ),
            committed: true,
        };

        let push = self
            .executor
            .capture(&git::push_head(&self.repo))
            .map_err(|e| push_failed(e.to_string()))?;
        if !push.success() {
            return Err(push_failed(push.output.trim().to_string()));
        }

        tracing::info!(message = %message, "release committed and pushed");
        Ok(())
    }
}
