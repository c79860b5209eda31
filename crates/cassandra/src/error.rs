use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The cluster was already closed.
    #[error("cluster already closed")]
    AlreadyClosed,

    /// The cluster was already started.
    #[error("cluster already started")]
    AlreadyStarted,

    /// The driver rejected the applied options at assembly time.
    #[error("failed to assemble cluster client: {0}")]
    Assemble(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// No initial connection to the cluster could be established.
    #[error("failed to connect to cluster: {0}")]
    Connect(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The configuration document violates a constraint.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The cipher-suite exclusions leave no enabled suites.
    #[error("excluded cipher suites leave no enabled cipher suites")]
    NoCipherSuitesEnabled,

    /// The cluster was never started.
    #[error("cluster not started")]
    NotStarted,

    /// Closing the cluster failed.
    #[error("cluster close failed: {0}")]
    Shutdown(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The TLS context parameters were rejected.
    #[error("cannot initialize TLS context: {0}")]
    TlsConfig(#[source] rustls::Error),

    /// The platform lacks a required TLS capability.
    #[error("TLS unavailable on this platform: {0}")]
    TlsEnvironment(&'static str),
}
