use std::path::PathBuf;

/// Failures that abort a whole invocation before any app is staged or a report is written.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("Repository contains uncommitted changes. Commit them before benchmarking or pass --force.")]
    UncommittedChanges,

    #[error("Unable to resolve the commit hash of HEAD")]
    UnresolvedCommit,

    #[error("Unknown application '{0}'. Run 'delite-bench list' to see the registered apps.")]
    UnknownApp(String),

    #[error("Unknown DSL '{0}'")]
    UnknownDsl(String),

    #[error("No timed commits found below {}", .0.display())]
    NoTimedCommits(PathBuf),
}
