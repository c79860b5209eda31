//! Interface boundary of the host process: the lifecycle, metrics, and
//! health-check registries that managed components are wired into.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;

/// Trait for components whose lifetime is bound to the host process.
///
/// The host calls `start` once before serving traffic and `stop` once
/// during shutdown, never concurrently. A failure from `start` aborts
/// host startup; a failure from `stop` is reported but does not block
/// the rest of the shutdown sequence.
#[async_trait]
pub trait Managed: Send + Sync + 'static {
    /// Start the component.
    async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Stop the component, releasing its resources.
    async fn stop(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Outcome of a single liveness probe run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HealthCheckResult {
    /// The dependency is serving requests correctly.
    Healthy,

    /// The dependency failed the probe.
    Unhealthy {
        /// Cause of the failure, for operators.
        message: String,
    },
}

impl HealthCheckResult {
    /// A passing result.
    #[must_use]
    pub const fn healthy() -> Self {
        Self::Healthy
    }

    /// A failing result carrying its cause.
    pub fn unhealthy(cause: impl Display) -> Self {
        Self::Unhealthy {
            message: cause.to_string(),
        }
    }

    /// Whether this result is passing.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Trait for liveness probes runnable by the host health-check registry.
///
/// Probes are stateless across calls and safe to invoke concurrently and
/// repeatedly.
#[async_trait]
pub trait HealthCheck: Send + Sync + 'static {
    /// Run the probe once.
    async fn check(&self) -> HealthCheckResult;
}

/// Handle to the host-process facilities available to managed components.
pub trait Environment: Send + Sync {
    /// Bind a component's start/stop behavior to the host lifecycle.
    fn manage(&self, managed: Arc<dyn Managed>);

    /// Register a named metrics sub-registry. Names must be unique within
    /// the process.
    fn register_metrics(&self, name: &str, registry: prometheus::Registry);

    /// Register a named liveness probe.
    fn register_health_check(&self, name: &str, check: Arc<dyn HealthCheck>);
}
