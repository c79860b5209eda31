//! Configures and supervises Cassandra cluster clients as managed
//! components of a host process.
//!
//! [`ClusterConfig`] turns a validated configuration document into a
//! built, unconnected client and binds it to the host's lifecycle,
//! metrics, and health-check registries. [`ManagedCluster`] drives the
//! eager connect at startup and the bounded graceful close at shutdown,
//! and [`CassandraHealthCheck`] surfaces the client's liveness.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod error;
mod health;
mod lifecycle;
mod serde_duration;
mod tls;

pub use config::{ClusterConfig, Credentials, SocketConfig};
pub use error::Error;
pub use health::CassandraHealthCheck;
pub use lifecycle::ManagedCluster;
pub use tls::{TlsConfig, effective_cipher_suites};
