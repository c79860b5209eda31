use async_trait::async_trait;
use plinth_cql::ClusterClient;
use plinth_host::{HealthCheck, HealthCheckResult};

/// A trivial, side-effect-free round trip against a system-local table.
const PROBE_STATEMENT: &str = "SELECT now() FROM system.local;";

/// Liveness probe issuing a trivial query against a connected cluster.
///
/// Stateless across calls and safe to run concurrently; a failing probe
/// reports unhealthy without touching the client's lifecycle.
#[derive(Clone)]
pub struct CassandraHealthCheck<C>
where
    C: ClusterClient,
{
    client: C,
}

impl<C> CassandraHealthCheck<C>
where
    C: ClusterClient,
{
    /// Creates a probe reading through `client`.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> HealthCheck for CassandraHealthCheck<C>
where
    C: ClusterClient,
{
    async fn check(&self) -> HealthCheckResult {
        match self.client.execute(PROBE_STATEMENT).await {
            Ok(()) => HealthCheckResult::healthy(),
            Err(e) => HealthCheckResult::unhealthy(e),
        }
    }
}
