use super::git_types::{GitError, GitOutput};

use std::{
    env::current_dir,
    io,
    path::{Path, PathBuf},
    process::{self, Child, Stdio},
};

use log::{debug, trace};

use itertools::Itertools;

pub(super) fn spawn_git_command(
    args: &[&str],
    working_dir: &Option<&Path>,
) -> Result<Child, io::Error> {
    let working_dir = working_dir.map(PathBuf::from).unwrap_or(current_dir()?);
    debug!("execute: git {}", args.iter().join(" "));
    process::Command::new("git")
        .env("LANG", "C.UTF-8")
        .env("LC_ALL", "C.UTF-8")
        .env("LANGUAGE", "C.UTF-8")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .current_dir(working_dir)
        .args(args)
        .spawn()
}

pub(super) fn capture_git_output(
    args: &[&str],
    working_dir: &Option<&Path>,
) -> Result<GitOutput, GitError> {
    let child = spawn_git_command(args, working_dir)?;
    let output = child.wait_with_output()?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    trace!("stdout: {stdout}");

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    trace!("stderr: {stderr}");

    let git_output = GitOutput { stdout, stderr };

    if output.status.success() {
        trace!("exec succeeded");
        Ok(git_output)
    } else {
        trace!("exec failed");
        Err(GitError::ExecError {
            command: args.join(" "),
            output: git_output,
        })
    }
}

pub(super) fn map_git_error(err: GitError) -> GitError {
    // There is no documented exit code for this; LANG is pinned above so the message is stable.
    match err {
        GitError::ExecError { command: _, output }
            if output.stderr.contains("not a git repository") =>
        {
            GitError::NotARepository { output }
        }
        _ => err,
    }
}

pub(super) fn git_rev_parse_short(
    reference: &str,
    working_dir: &Option<&Path>,
) -> Result<String, GitError> {
    capture_git_output(
        &["rev-parse", "--verify", "-q", "--short", reference],
        working_dir,
    )
    .map_err(|_e| GitError::MissingHead {
        reference: reference.into(),
    })
    .map(|s| s.stdout.trim().to_owned())
}

pub(super) fn git_show_toplevel(working_dir: &Option<&Path>) -> Result<String, GitError> {
    capture_git_output(&["rev-parse", "--show-toplevel"], working_dir)
        .map_err(map_git_error)
        .map(|s| s.stdout.trim().to_owned())
}

pub(super) fn git_status_short(working_dir: &Option<&Path>) -> Result<Vec<String>, GitError> {
    let output = capture_git_output(&["status", "--porcelain"], working_dir).map_err(map_git_error)?;
    Ok(output
        .stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_owned)
        .collect())
}

pub(super) fn git_log_short_hashes(working_dir: &Option<&Path>) -> Result<Vec<String>, GitError> {
    let output = capture_git_output(
        &["--no-pager", "log", "--no-color", "--pretty=format:%h"],
        working_dir,
    )
    .map_err(map_git_error)?;
    Ok(output
        .stdout
        .lines()
        .map(|l| l.trim().to_owned())
        .filter(|l| !l.is_empty())
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::test_helpers::{dir_with_repo, run_git_command};
    use std::fs;

    #[test]
    fn test_rev_parse_short() {
        let repo_dir = dir_with_repo();
        let revision = git_rev_parse_short("HEAD", &Some(repo_dir.path())).unwrap();
        assert!(
            revision.len() >= 7 && revision.chars().all(|c| c.is_ascii_hexdigit()),
            "'{}' is not a short hash",
            &revision
        );
    }

    #[test]
    fn test_missing_head() {
        let dir = tempfile::tempdir().unwrap();
        run_git_command(&["init", "--initial-branch", "master"], dir.path());
        assert!(matches!(
            git_rev_parse_short("HEAD", &Some(dir.path())),
            Err(GitError::MissingHead { .. })
        ));
    }

    #[test]
    fn test_status_and_log() {
        let repo_dir = dir_with_repo();
        let path = Some(repo_dir.path());
        assert!(git_status_short(&path).unwrap().is_empty());

        fs::write(repo_dir.path().join("dirty.txt"), "x").unwrap();
        assert_eq!(git_status_short(&path).unwrap().len(), 1);

        run_git_command(&["add", "dirty.txt"], repo_dir.path());
        run_git_command(&["commit", "-m", "second"], repo_dir.path());
        let hashes = git_log_short_hashes(&path).unwrap();
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0], git_rev_parse_short("HEAD", &path).unwrap());
    }

    #[test]
    fn test_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            git_show_toplevel(&Some(dir.path())),
            Err(GitError::NotARepository { .. })
        ));
    }
}
