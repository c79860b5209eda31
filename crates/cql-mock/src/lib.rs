//! Scriptable in-memory implementation of the CQL driver contract, for
//! tests and local development.
//!
//! The builder records every option applied to it so assertions can be
//! made against the assembled client, and failure points (connect,
//! execute, close) can be injected ahead of time.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use plinth_cql::{
    AuthCredentials, CloseHandle, ClusterBuilder, ClusterClient, Compression, Metadata, NodeInfo,
    SocketOptions, TlsOptions,
};
use tokio::sync::Notify;

/// How a mock close behaves once initiated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CloseBehavior {
    /// Complete immediately.
    #[default]
    Immediate,

    /// Complete after the given delay.
    After(Duration),

    /// Never complete on its own; only forcing finishes it.
    Hang,

    /// Fail the graceful close. Forcing still finishes it.
    Fail,
}

/// Options applied through the builder, recorded for assertions.
#[derive(Clone, Debug, Default)]
pub struct AppliedOptions {
    /// Hosts passed as contact points.
    pub contact_points: Vec<String>,

    /// Port applied alongside the contact points.
    pub port: Option<u16>,

    /// Cluster name, when one was configured.
    pub cluster_name: Option<String>,

    /// Negotiated compression, when applied.
    pub compression: Option<Compression>,

    /// Materialized transport options, when applied.
    pub socket_options: Option<SocketOptions>,

    /// Plaintext credentials, when attached.
    pub credentials: Option<AuthCredentials>,

    /// TLS material, when attached.
    pub tls: Option<TlsOptions>,

    /// Whether the built-in metrics exporter was turned off.
    pub metrics_export_disabled: bool,
}

/// Builder producing [`MockCluster`] clients.
pub struct MockClusterBuilder {
    applied: AppliedOptions,
    build_error: Option<String>,
    close_behavior: CloseBehavior,
    connect_error: Option<String>,
    execute_error: Option<String>,
    nodes: Vec<NodeInfo>,
    reported_name: String,
}

impl MockClusterBuilder {
    /// Creates a builder for a cluster self-reporting the name `mock`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            applied: AppliedOptions::default(),
            build_error: None,
            close_behavior: CloseBehavior::Immediate,
            connect_error: None,
            execute_error: None,
            nodes: Vec::new(),
            reported_name: "mock".to_owned(),
        }
    }

    /// Sets the name the cluster self-reports when none is configured.
    #[must_use]
    pub fn with_reported_name(mut self, name: impl Into<String>) -> Self {
        self.reported_name = name.into();
        self
    }

    /// Adds a member to the topology snapshot.
    #[must_use]
    pub fn with_node(mut self, node: NodeInfo) -> Self {
        self.nodes.push(node);
        self
    }

    /// Scripts `build` to fail.
    #[must_use]
    pub fn with_build_error(mut self, message: impl Into<String>) -> Self {
        self.build_error = Some(message.into());
        self
    }

    /// Scripts `connect` to fail.
    #[must_use]
    pub fn with_connect_error(mut self, message: impl Into<String>) -> Self {
        self.connect_error = Some(message.into());
        self
    }

    /// Scripts `execute` to fail.
    #[must_use]
    pub fn with_execute_error(mut self, message: impl Into<String>) -> Self {
        self.execute_error = Some(message.into());
        self
    }

    /// Scripts how closes behave.
    #[must_use]
    pub fn with_close_behavior(mut self, behavior: CloseBehavior) -> Self {
        self.close_behavior = behavior;
        self
    }
}

impl Default for MockClusterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterBuilder for MockClusterBuilder {
    type Client = MockCluster;
    type Error = Error;

    fn contact_points(mut self, hosts: &[String], port: u16) -> Self {
        self.applied.contact_points = hosts.to_vec();
        self.applied.port = Some(port);
        self
    }

    fn cluster_name(mut self, name: Option<&str>) -> Self {
        self.applied.cluster_name = name.map(str::to_owned);
        self
    }

    fn compression(mut self, compression: Compression) -> Self {
        self.applied.compression = Some(compression);
        self
    }

    fn socket_options(mut self, options: SocketOptions) -> Self {
        self.applied.socket_options = Some(options);
        self
    }

    fn credentials(mut self, credentials: AuthCredentials) -> Self {
        self.applied.credentials = Some(credentials);
        self
    }

    fn tls(mut self, options: TlsOptions) -> Self {
        self.applied.tls = Some(options);
        self
    }

    fn disable_metrics_export(mut self) -> Self {
        self.applied.metrics_export_disabled = true;
        self
    }

    fn build(self) -> Result<MockCluster, Error> {
        if let Some(message) = self.build_error {
            return Err(Error::Build(message));
        }

        let cluster_name = self
            .applied
            .cluster_name
            .clone()
            .unwrap_or(self.reported_name);

        Ok(MockCluster {
            inner: Arc::new(Inner {
                applied: self.applied,
                close_behavior: self.close_behavior,
                close_calls: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                cluster_name,
                connect_calls: AtomicUsize::new(0),
                connect_error: self.connect_error,
                connected: AtomicBool::new(false),
                execute_error: Mutex::new(self.execute_error),
                forced: AtomicBool::new(false),
                forced_notify: Notify::new(),
                nodes: self.nodes,
                registry: prometheus::Registry::new(),
            }),
        })
    }
}

struct Inner {
    applied: AppliedOptions,
    close_behavior: CloseBehavior,
    close_calls: AtomicUsize,
    closed: AtomicBool,
    cluster_name: String,
    connect_calls: AtomicUsize,
    connect_error: Option<String>,
    connected: AtomicBool,
    execute_error: Mutex<Option<String>>,
    forced: AtomicBool,
    forced_notify: Notify,
    nodes: Vec<NodeInfo>,
    registry: prometheus::Registry,
}

impl Inner {
    fn finish_close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// In-memory cluster client recording how it was assembled and driven.
#[derive(Clone)]
pub struct MockCluster {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MockCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCluster")
            .field("cluster_name", &self.inner.cluster_name)
            .finish()
    }
}

impl MockCluster {
    /// The options applied through the builder.
    #[must_use]
    pub fn applied(&self) -> AppliedOptions {
        self.inner.applied.clone()
    }

    /// Whether `connect` has succeeded and no close has finished since.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Whether a close has finished.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Whether any close was forced.
    #[must_use]
    pub fn was_forced(&self) -> bool {
        self.inner.forced.load(Ordering::SeqCst)
    }

    /// Number of times `connect` was called.
    #[must_use]
    pub fn connect_calls(&self) -> usize {
        self.inner.connect_calls.load(Ordering::SeqCst)
    }

    /// Number of times a close was initiated.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    /// Scripts or clears an `execute` failure on the live client.
    pub fn set_execute_error(&self, message: Option<&str>) {
        *self.inner.execute_error.lock().unwrap() = message.map(str::to_owned);
    }
}

#[async_trait]
impl ClusterClient for MockCluster {
    type Close = MockCloseHandle;
    type Error = Error;

    async fn connect(&self) -> Result<(), Error> {
        self.inner.connect_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.inner.connect_error {
            return Err(Error::Connect(message.clone()));
        }

        self.inner.connected.store(true, Ordering::SeqCst);

        Ok(())
    }

    fn cluster_name(&self) -> String {
        self.inner.cluster_name.clone()
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            cluster_name: self.inner.cluster_name.clone(),
            nodes: self.inner.nodes.clone(),
        }
    }

    fn metrics(&self) -> prometheus::Registry {
        self.inner.registry.clone()
    }

    async fn execute(&self, _statement: &str) -> Result<(), Error> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        if let Some(message) = self.inner.execute_error.lock().unwrap().clone() {
            return Err(Error::Execute(message));
        }

        Ok(())
    }

    fn close(&self) -> MockCloseHandle {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);

        MockCloseHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Handle to an in-flight mock close.
pub struct MockCloseHandle {
    inner: Arc<Inner>,
}

#[async_trait]
impl CloseHandle for MockCloseHandle {
    type Error = Error;

    async fn wait(&self) -> Result<(), Error> {
        if self.inner.closed.load(Ordering::SeqCst) || self.inner.forced.load(Ordering::SeqCst) {
            self.inner.finish_close();
            return Ok(());
        }

        let graceful = async {
            match self.inner.close_behavior {
                CloseBehavior::Immediate => Ok(()),
                CloseBehavior::After(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(())
                }
                CloseBehavior::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
                CloseBehavior::Fail => Err(Error::Close("scripted close failure".to_owned())),
            }
        };

        tokio::select! {
            result = graceful => match result {
                Ok(()) => {
                    self.inner.finish_close();
                    Ok(())
                }
                Err(e) => Err(e),
            },
            () = self.inner.forced_notify.notified() => {
                self.inner.finish_close();
                Ok(())
            }
        }
    }

    fn force(&self) {
        self.inner.forced.store(true, Ordering::SeqCst);
        self.inner.forced_notify.notify_one();
    }
}
