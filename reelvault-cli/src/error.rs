use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Repository operation failed
    #[error("{0}")]
    Repo(#[from] reelvault_repo::RepoError),

    /// Server startup failed
    #[error("{0}")]
    Server(#[from] reelvault_http::ServerError),
}
