use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::error::BenchError;

use super::git_lowlevel::{
    git_log_short_hashes, git_rev_parse_short, git_show_toplevel, git_status_short,
};

/// The repository and commit that a benchmark run is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub commit: String,
}

pub fn get_repository_root(working_dir: Option<&Path>) -> Result<PathBuf> {
    let root = git_show_toplevel(&working_dir).context("Failed to determine repository root")?;
    Ok(PathBuf::from(root))
}

pub fn get_head_short_hash(working_dir: Option<&Path>) -> Result<String> {
    git_rev_parse_short("HEAD", &working_dir).map_err(|e| {
        debug!("{e}");
        BenchError::UnresolvedCommit.into()
    })
}

/// Lines of `git status --porcelain`; empty for a clean working tree.
pub fn get_uncommitted_changes(working_dir: Option<&Path>) -> Result<Vec<String>> {
    Ok(git_status_short(&working_dir)?)
}

/// Short hashes of all commits reachable from HEAD, newest first.
pub fn get_commit_log(working_dir: Option<&Path>) -> Result<Vec<String>> {
    git_log_short_hashes(&working_dir).context("Failed to read commit log")
}

/// Resolve the repository root and the short hash of HEAD.
///
/// Timings must belong to an exact commit, so a dirty working tree is refused
/// unless `force` is set.
pub fn verify_workspace(working_dir: Option<&Path>, force: bool) -> Result<Workspace> {
    let root = get_repository_root(working_dir)?;
    let changes = get_uncommitted_changes(Some(&root))?;
    if !changes.is_empty() {
        if force {
            warn!(
                "Working tree has {} uncommitted change(s), continuing anyway",
                changes.len()
            );
        } else {
            return Err(BenchError::UncommittedChanges.into());
        }
    }
    let commit = get_head_short_hash(Some(&root))?;
    debug!("Workspace {} at commit {}", root.display(), commit);
    Ok(Workspace { root, commit })
}
