use std::path::Path;

use crate::cmd;
use crate::error::{DeployError, DeployResult};

/// Version control queries the tool depends on.
pub trait VersionControl {
    /// Name of the branch checked out in the working directory.
    fn current_branch(&self) -> DeployResult<String>;

    /// Branch names on `remote` of the repository at `repo`,
    /// without the remote prefix.
    fn remote_branches(&self, repo: &Path, remote: &str) -> DeployResult<Vec<String>>;
}

/// `git` CLI on PATH.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git;

impl VersionControl for Git {
    fn current_branch(&self) -> DeployResult<String> {
        let branch = cmd::run("git", &["branch", "--show-current"])
            .map_err(|e| DeployError::TagResolution(e.to_string()))?;
        if branch.is_empty() {
            return Err(DeployError::TagResolution(
                "no branch checked out (detached HEAD?)".into(),
            ));
        }
        Ok(branch)
    }

    fn remote_branches(&self, repo: &Path, remote: &str) -> DeployResult<Vec<String>> {
        let repo = repo.to_string_lossy();
        cmd::run("git", &["-C", &repo, "fetch", "--prune", remote])?;
        let output = cmd::run(
            "git",
            &[
                "-C",
                &repo,
                "branch",
                "--remotes",
                "--format=%(refname:short)",
            ],
        )?;
        Ok(parse_remote_branches(&output, remote))
    }
}

impl Git {
    /// `Name <email>` of the configured git user.
    pub fn author() -> DeployResult<String> {
        let name = cmd::run("git", &["config", "user.name"])?;
        let email = cmd::run("git", &["config", "user.email"])?;
        Ok(format!("{name} <{email}>"))
    }

    pub fn commit_sha() -> DeployResult<String> {
        cmd::run("git", &["rev-parse", "HEAD"])
    }

    /// Check out `branch` in the repository at `repo` and pull it.
    pub fn switch_and_pull(repo: &Path, branch: &str) -> DeployResult<()> {
        let repo = repo.to_string_lossy();
        cmd::run_interactive("git", &["-C", &repo, "switch", branch])?;
        cmd::run_interactive("git", &["-C", &repo, "pull"])
    }
}

/// Strip the `<remote>/` prefix from `git branch --remotes`
/// output, dropping the symbolic `HEAD` entry.
#[must_use]
pub fn parse_remote_branches(output: &str, remote: &str) -> Vec<String> {
    let prefix = format!("{remote}/");
    output
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(&prefix))
        .filter(|name| *name != "HEAD" && !name.starts_with("HEAD "))
        .map(str::to_string)
        .collect()
}
