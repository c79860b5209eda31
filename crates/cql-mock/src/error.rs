use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Client assembly was scripted to fail.
    #[error("build failed: {0}")]
    Build(String),

    /// The graceful close was scripted to fail.
    #[error("close failed: {0}")]
    Close(String),

    /// The client is closed.
    #[error("client is closed")]
    Closed,

    /// Connecting was scripted to fail.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Statement execution was scripted to fail.
    #[error("execute failed: {0}")]
    Execute(String),
}
