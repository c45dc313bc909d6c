//! Shared fixtures for unit tests, integration tests and benchmarks.
//!
//! Git commands run hermetically so the user's configuration cannot leak into
//! the repositories created here.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::{tempdir, TempDir};

const HERMETIC_GIT_ENV: [(&str, &str); 6] = [
    ("GIT_CONFIG_NOSYSTEM", "true"),
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
    ("GIT_AUTHOR_NAME", "testuser"),
    ("GIT_AUTHOR_EMAIL", "testuser@example.com"),
    ("GIT_COMMITTER_NAME", "testuser"),
    ("GIT_COMMITTER_EMAIL", "testuser@example.com"),
];

fn git(args: &[&str], dir: &Path) -> Command {
    let mut command = Command::new("git");
    command.args(args).envs(HERMETIC_GIT_ENV).current_dir(dir);
    command
}

/// Runs a git command in `dir`.
///
/// # Panics
/// Panics if the git command fails or returns a non-zero exit status.
pub fn run_git_command(args: &[&str], dir: &Path) {
    assert!(git(args, dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("Failed to spawn git command")
        .success());
}

/// Runs a git command in `dir` and returns its trimmed standard output.
pub fn git_output(args: &[&str], dir: &Path) -> String {
    let output = git(args, dir).output().expect("Failed to spawn git command");
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_owned()
}

/// Initializes a git repository in `dir` with an initial empty commit.
pub fn init_repo(dir: &Path) {
    run_git_command(&["init", "--initial-branch", "master"], dir);
    run_git_command(&["commit", "--allow-empty", "-m", "Initial commit"], dir);
}

/// Creates a temporary directory with an initialized git repository.
pub fn dir_with_repo() -> TempDir {
    let tempdir = tempdir().unwrap();
    init_repo(tempdir.path());
    tempdir
}

/// Adds an empty commit to the repository in `dir` and returns its short hash.
pub fn empty_commit(dir: &Path, message: &str) -> String {
    run_git_command(&["commit", "--allow-empty", "-m", message], dir);
    head_short_hash(dir)
}

pub fn head_short_hash(dir: &Path) -> String {
    git_output(&["rev-parse", "--short", "HEAD"], dir)
}

/// Writes a timing file below `store_root` the way a timed run leaves it:
/// one value in microseconds per line.
pub fn write_times(store_root: &Path, commit: &str, app: &str, config: &str, micros: &[u64]) {
    let dir = store_root.join(commit);
    fs::create_dir_all(&dir).unwrap();
    let content: String = micros.iter().map(|m| format!("{}\n", m)).collect();
    fs::write(dir.join(format!("{}-{}.times", app, config)), content).unwrap();
}
