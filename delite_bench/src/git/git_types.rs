use std::io;

#[derive(Debug)]
pub(super) struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub(super) enum GitError {
    #[error("Missing HEAD for {reference}")]
    MissingHead { reference: String },

    #[error("Not inside a git repository:\n{0}", output.stderr)]
    NotARepository { output: GitOutput },

    #[error("Git failed to execute.\n\nstdout:\n{0}\nstderr:\n{1}", output.stdout, output.stderr)]
    ExecError { command: String, output: GitOutput },

    #[error("Failed to execute git command")]
    IoError(#[from] io::Error),
}
