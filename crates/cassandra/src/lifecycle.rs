use std::time::Duration;

use async_trait::async_trait;
use plinth_cql::{CloseHandle, ClusterClient};
use plinth_host::Managed;
use tokio::sync::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Uninitialized,
    Connected,
    Closed,
}

/// Supervises a cluster client as part of the host process lifecycle.
///
/// [`start`](Self::start) eagerly establishes the initial connections;
/// [`stop`](Self::stop) drains the client within the configured grace
/// period and force-closes it once the period elapses. States move
/// strictly forward, so a cluster cannot be restarted after a stop.
pub struct ManagedCluster<C>
where
    C: ClusterClient,
{
    client: C,
    shutdown_timeout: Duration,
    shutdown_token: CancellationToken,
    state: Mutex<State>,
}

impl<C> ManagedCluster<C>
where
    C: ClusterClient,
{
    /// Creates a wrapper supervising `client`, which must be unconnected.
    #[must_use]
    pub fn new(client: C, shutdown_timeout: Duration) -> Self {
        Self {
            client,
            shutdown_timeout,
            shutdown_token: CancellationToken::new(),
            state: Mutex::new(State::Uninitialized),
        }
    }

    /// The cluster name of the supervised client.
    #[must_use]
    pub fn cluster_name(&self) -> String {
        self.client.cluster_name()
    }

    /// Token the host may cancel to abandon waiting for a graceful close.
    ///
    /// Cancelling stops the bounded wait in [`stop`](Self::stop) without
    /// forcing the close; the drain continues in the background.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Eagerly connects to the cluster.
    ///
    /// Logs the resolved cluster name, and every known member's identity
    /// when debug logging is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] or [`Error::AlreadyClosed`] on
    /// reuse, and [`Error::Connect`] when no initial connection could be
    /// established. A connect failure must abort host startup.
    pub async fn start(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        match *state {
            State::Uninitialized => {}
            State::Connected => return Err(Error::AlreadyStarted),
            State::Closed => return Err(Error::AlreadyClosed),
        }

        self.client
            .connect()
            .await
            .map_err(|e| Error::Connect(Box::new(e)))?;
        *state = State::Connected;

        let metadata = self.client.metadata();
        info!(cluster = %metadata.cluster_name, "connected to cluster");

        if tracing::enabled!(tracing::Level::DEBUG) {
            for node in &metadata.nodes {
                debug!(
                    address = %node.address,
                    datacenter = node.datacenter.as_deref().unwrap_or("unknown"),
                    rack = node.rack.as_deref().unwrap_or("unknown"),
                    version = node.version.as_deref().unwrap_or("unknown"),
                    "cluster member"
                );
            }
        }

        Ok(())
    }

    /// Closes the client, waiting up to the configured grace period for
    /// in-flight requests to drain.
    ///
    /// Once the grace period elapses the close is forced, abandoning
    /// in-flight requests, and awaited without bound. Cancelling
    /// [`shutdown_token`](Self::shutdown_token) abandons the wait instead,
    /// without forcing; the drain continues in the background.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotStarted`] or [`Error::AlreadyClosed`] on
    /// misuse, and [`Error::Shutdown`] when the driver reports a close
    /// failure. Close failures are reported to the caller but must not
    /// block the host's overall shutdown sequence.
    pub async fn stop(&self) -> Result<(), Error> {
        {
            let mut state = self.state.lock().await;
            match *state {
                State::Connected => {}
                State::Uninitialized => return Err(Error::NotStarted),
                State::Closed => return Err(Error::AlreadyClosed),
            }
            *state = State::Closed;
        }

        let handle = self.client.close();

        tokio::select! {
            () = self.shutdown_token.cancelled() => {
                info!(
                    cluster = %self.client.cluster_name(),
                    "shutdown wait cancelled, close continues in background"
                );
                Ok(())
            }
            outcome = time::timeout(self.shutdown_timeout, handle.wait()) => match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(Error::Shutdown(Box::new(e))),
                Err(_) => {
                    warn!(
                        cluster = %self.client.cluster_name(),
                        timeout = ?self.shutdown_timeout,
                        "graceful close timed out, forcing immediate close"
                    );
                    handle.force();
                    handle.wait().await.map_err(|e| Error::Shutdown(Box::new(e)))
                }
            },
        }
    }
}

#[async_trait]
impl<C> Managed for ManagedCluster<C>
where
    C: ClusterClient,
{
    async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        ManagedCluster::start(self).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        ManagedCluster::stop(self).await?;
        Ok(())
    }
}
