//! Interface boundary of the CQL driver: the narrow contract used to
//! configure a cluster client and supervise its connect/close lifecycle.
//!
//! Everything behind this boundary (wire protocol, query execution, retry
//! and load-balancing policies, topology tracking) belongs to the driver
//! implementation and is out of scope here.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Compression algorithms negotiable on the native protocol.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// No compression.
    #[default]
    None,

    /// Snappy compression.
    Snappy,

    /// LZ4 compression.
    Lz4,
}

/// Transport-level options materialized from configuration.
///
/// The two timeouts are always set explicitly. Every other field left
/// `None` is not applied to the transport at all, leaving the platform
/// default in effect; `None` and `Some(0)`/`Some(false)` are distinct
/// states.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SocketOptions {
    /// Timeout for establishing a single connection, in whole milliseconds.
    pub connect_timeout_ms: u64,

    /// Timeout for awaiting a response on an open connection, in whole
    /// milliseconds.
    pub read_timeout_ms: u64,

    /// `SO_KEEPALIVE`.
    pub keep_alive: Option<bool>,

    /// `SO_REUSEADDR`.
    pub reuse_address: Option<bool>,

    /// `SO_LINGER`, in whole seconds.
    pub linger_secs: Option<u64>,

    /// `TCP_NODELAY`.
    pub no_delay: Option<bool>,

    /// `SO_RCVBUF`, in bytes.
    pub receive_buffer_size: Option<u64>,

    /// `SO_SNDBUF`, in bytes.
    pub send_buffer_size: Option<u64>,
}

/// Plaintext credentials attached to a cluster client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthCredentials {
    /// The username to authenticate as.
    pub username: String,

    /// The password. An empty string is a valid password.
    pub password: String,
}

/// Identity of a single cluster member, as known at connect time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeInfo {
    /// Network address of the member.
    pub address: SocketAddr,

    /// Datacenter the member belongs to, when the cluster reports one.
    pub datacenter: Option<String>,

    /// Rack the member belongs to, when the cluster reports one.
    pub rack: Option<String>,

    /// Server version the member runs, when the cluster reports one.
    pub version: Option<String>,
}

/// Topology snapshot exposed by a connected client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Metadata {
    /// The cluster's self-reported name.
    pub cluster_name: String,

    /// Every member known at the time of the snapshot.
    pub nodes: Vec<NodeInfo>,
}

/// Cipher suites enabled by the driver by default, in negotiation
/// preference order.
pub const DEFAULT_CIPHER_SUITES: &[&str] = &[
    "TLS13_AES_256_GCM_SHA384",
    "TLS13_AES_128_GCM_SHA256",
    "TLS13_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
];

/// TLS material handed to the driver: a ready client context plus the
/// effective cipher-suite names, in preference order.
#[derive(Clone, Debug)]
pub struct TlsOptions {
    /// Client context restricted to the effective cipher suites.
    pub config: Arc<rustls::ClientConfig>,

    /// Names of the enabled cipher suites, in preference order.
    pub cipher_suites: Vec<String>,
}

/// Builder for cluster clients.
///
/// Methods consume and return the builder, driver style. `build` produces
/// a constructed but unconnected client; connection establishment is
/// deferred to [`ClusterClient::connect`].
pub trait ClusterBuilder: Send {
    /// Client type produced by this builder.
    type Client: ClusterClient;

    /// Error produced when client assembly fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Set the contact points used to discover the cluster topology. The
    /// same port applies to every host.
    #[must_use]
    fn contact_points(self, hosts: &[String], port: u16) -> Self;

    /// Set the cluster name. `None` lets the driver use the cluster's
    /// self-reported name.
    #[must_use]
    fn cluster_name(self, name: Option<&str>) -> Self;

    /// Set the compression negotiated on the native protocol.
    #[must_use]
    fn compression(self, compression: Compression) -> Self;

    /// Apply materialized transport options.
    #[must_use]
    fn socket_options(self, options: SocketOptions) -> Self;

    /// Attach plaintext authentication.
    #[must_use]
    fn credentials(self, credentials: AuthCredentials) -> Self;

    /// Attach TLS to every connection.
    #[must_use]
    fn tls(self, options: TlsOptions) -> Self;

    /// Turn off the driver's built-in out-of-process metrics exporter.
    #[must_use]
    fn disable_metrics_export(self) -> Self;

    /// Assemble the client, unconnected.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when the applied options cannot be
    /// assembled into a client.
    fn build(self) -> Result<Self::Client, Self::Error>;
}

/// Handle to an in-flight close of a cluster client.
#[async_trait]
pub trait CloseHandle: Send + Sync {
    /// Error surfaced when the close fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Wait for the close to finish. May be awaited again after an
    /// abandoned earlier wait.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when the close fails.
    async fn wait(&self) -> Result<(), Self::Error>;

    /// Abandon in-flight requests and terminate all connections
    /// immediately. Completion is still observed through
    /// [`wait`](Self::wait).
    fn force(&self);
}

/// A connection-pool handle to a cluster.
///
/// Construction leaves the client unconnected. Once connected, the client
/// is safe for concurrent use by multiple callers; handles are cheap to
/// clone and share one underlying pool.
#[async_trait]
pub trait ClusterClient: Clone + Send + Sync + 'static {
    /// Error surfaced by driver operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handle type tracking a close initiated on this client.
    type Close: CloseHandle<Error = Self::Error>;

    /// Eagerly establish all initial connections.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when no initial connection could be
    /// established.
    async fn connect(&self) -> Result<(), Self::Error>;

    /// The cluster name: the configured one, or the cluster's
    /// self-reported name when none was configured.
    fn cluster_name(&self) -> String;

    /// Snapshot of the currently known cluster topology.
    fn metadata(&self) -> Metadata;

    /// The client's metrics, for registration with an external registry.
    fn metrics(&self) -> prometheus::Registry;

    /// Execute a single statement, discarding its result.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when the round trip fails.
    async fn execute(&self, statement: &str) -> Result<(), Self::Error>;

    /// Initiate a graceful close without blocking. In-flight requests are
    /// allowed to drain; progress is tracked through the returned handle.
    fn close(&self) -> Self::Close;
}
