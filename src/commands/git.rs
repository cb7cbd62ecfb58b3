//! Git invocations used by the release workflow.
//!
//! All commands run in the repository root with terminal prompts disabled so
//! that a missing credential fails the step instead of blocking on input.

use std::path::Path;

use super::CommandDescriptor;

fn git(repo: &Path) -> CommandDescriptor {
    CommandDescriptor::new("git")
        .current_dir(repo)
        .env("GIT_TERMINAL_PROMPT", "0")
        .quiet()
}

/// Refreshes cached stat information so the cleanliness check sees real changes only.
pub fn refresh_index(repo: &Path) -> CommandDescriptor {
    git(repo).args(["update-index", "-q", "--refresh"])
}

/// Exits 1 when tracked files differ from HEAD.
pub fn diff_index_quiet(repo: &Path) -> CommandDescriptor {
    git(repo).args(["diff-index", "--quiet", "HEAD"])
}

/// Prints the current branch name.
pub fn current_branch(repo: &Path) -> CommandDescriptor {
    git(repo).args(["rev-parse", "--abbrev-ref", "HEAD"])
}

pub fn fetch(repo: &Path) -> CommandDescriptor {
    git(repo).arg("fetch")
}

/// Exits 1 when HEAD differs from `origin/<branch>`.
pub fn diff_remote_quiet(repo: &Path, branch: &str) -> CommandDescriptor {
    git(repo)
        .args(["diff", "--quiet", "HEAD"])
        .arg(format!("origin/{}", branch))
}

/// Commits all tracked modifications.
pub fn commit_all(repo: &Path, message: &str) -> CommandDescriptor {
    git(repo).args(["commit", "-am", message])
}

/// Pushes the current branch to origin.
pub fn push_head(repo: &Path) -> CommandDescriptor {
    git(repo).args(["push", "origin", "HEAD"])
}
