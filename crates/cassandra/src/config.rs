use std::sync::Arc;
use std::time::Duration;

use plinth_cql::{AuthCredentials, ClusterBuilder, ClusterClient, Compression, SocketOptions};
use plinth_host::Environment;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::health::CassandraHealthCheck;
use crate::lifecycle::ManagedCluster;
use crate::serde_duration;
use crate::tls::TlsConfig;

const DEFAULT_PORT: u16 = 9042;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5_000);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(12_000);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Username and password for plaintext authentication.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    /// The username to authenticate as. Must not be empty.
    pub username: String,

    /// The password. Absent is treated as the empty string.
    #[serde(default)]
    pub password: Option<String>,
}

/// Transport-level tuning for connections to the cluster.
///
/// Optional fields left unset are never applied to the transport; the
/// platform default stays in effect. Unset and zero/false are distinct
/// states.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SocketConfig {
    /// Timeout for establishing a single connection. At least 1ms.
    #[serde(with = "serde_duration")]
    pub connect_timeout: Duration,

    /// Timeout for awaiting a response on an open connection. At least 1ms.
    #[serde(with = "serde_duration")]
    pub read_timeout: Duration,

    /// `SO_KEEPALIVE`.
    pub keep_alive: Option<bool>,

    /// `SO_REUSEADDR`.
    pub reuse_address: Option<bool>,

    /// `SO_LINGER`. Applied in whole seconds, truncating.
    #[serde(with = "serde_duration::opt")]
    pub linger: Option<Duration>,

    /// `TCP_NODELAY`.
    pub no_delay: Option<bool>,

    /// `SO_RCVBUF`, in bytes.
    pub receive_buffer_size: Option<u64>,

    /// `SO_SNDBUF`, in bytes.
    pub send_buffer_size: Option<u64>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            keep_alive: None,
            reuse_address: None,
            linger: None,
            no_delay: None,
            receive_buffer_size: None,
            send_buffer_size: None,
        }
    }
}

impl SocketConfig {
    /// Materializes driver socket options.
    ///
    /// The two timeouts are always set, truncated to whole milliseconds;
    /// linger is truncated to whole seconds; every other optional field is
    /// carried over only when present.
    #[must_use]
    pub fn build(&self) -> SocketOptions {
        SocketOptions {
            connect_timeout_ms: whole_millis(self.connect_timeout),
            read_timeout_ms: whole_millis(self.read_timeout),
            keep_alive: self.keep_alive,
            reuse_address: self.reuse_address,
            linger_secs: self.linger.map(|linger| linger.as_secs()),
            no_delay: self.no_delay,
            receive_buffer_size: self.receive_buffer_size,
            send_buffer_size: self.send_buffer_size,
        }
    }
}

fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration for assembling supervised Cassandra cluster clients.
///
/// A config is immutable once validated; [`build`](Self::build) reads it
/// without retaining it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    /// Contact points used to discover the cluster topology. Must not be
    /// empty.
    pub hosts: Vec<String>,

    /// Native protocol port, applied to every contact point.
    pub port: u16,

    /// Plaintext authentication credentials. Absent attaches no
    /// authentication at all.
    pub credentials: Option<Credentials>,

    /// Compression negotiated on the native protocol.
    pub compression: Compression,

    /// Transport-level tuning.
    pub socket: SocketConfig,

    /// TLS settings. Absent disables TLS.
    pub tls: Option<TlsConfig>,

    /// Grace period for draining in-flight requests at shutdown.
    #[serde(with = "serde_duration")]
    pub shutdown_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            port: DEFAULT_PORT,
            credentials: None,
            compression: Compression::None,
            socket: SocketConfig::default(),
            tls: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ClusterConfig {
    /// Checks the document constraints the rest of this crate relies on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the violated constraint.
    pub fn validate(&self) -> Result<(), Error> {
        if self.hosts.is_empty() {
            return Err(Error::InvalidConfig("hosts must not be empty"));
        }

        if self.port == 0 {
            return Err(Error::InvalidConfig("port must be in 1..=65535"));
        }

        if let Some(credentials) = &self.credentials {
            if credentials.username.is_empty() {
                return Err(Error::InvalidConfig("username must not be empty"));
            }
        }

        if self.socket.connect_timeout < MIN_TIMEOUT {
            return Err(Error::InvalidConfig("connect timeout must be at least 1ms"));
        }

        if self.socket.read_timeout < MIN_TIMEOUT {
            return Err(Error::InvalidConfig("read timeout must be at least 1ms"));
        }

        if self.shutdown_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "shutdown timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Assembles a client with the cluster's self-reported name.
    ///
    /// See [`build_named`](Self::build_named).
    ///
    /// # Errors
    ///
    /// As for [`build_named`](Self::build_named).
    pub fn build<B, E>(&self, builder: B, environment: &E) -> Result<B::Client, Error>
    where
        B: ClusterBuilder,
        E: Environment + ?Sized,
    {
        self.build_named(builder, environment, None)
    }

    /// Assembles a cluster client and binds it to the host process.
    ///
    /// Applies, in order: contact points, cluster name, compression,
    /// materialized socket options; turns off the driver's own metrics
    /// exporter (metrics flow through the host registry instead); attaches
    /// authentication only when credentials are configured, substituting an
    /// empty password for an absent one; attaches TLS only when configured.
    ///
    /// The returned client is unconnected; connection establishment happens
    /// when the host lifecycle starts the registered [`ManagedCluster`].
    /// Exactly once per built client, before returning, the client is
    /// registered with the host lifecycle and its metrics and liveness
    /// probe are registered under `cassandra-{cluster_name}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the document violates a
    /// constraint, a TLS error when deriving TLS options fails, and
    /// [`Error::Assemble`] when the driver rejects the applied options.
    pub fn build_named<B, E>(
        &self,
        builder: B,
        environment: &E,
        name: Option<&str>,
    ) -> Result<B::Client, Error>
    where
        B: ClusterBuilder,
        E: Environment + ?Sized,
    {
        self.validate()?;

        let mut builder = builder
            .contact_points(&self.hosts, self.port)
            .cluster_name(name)
            .compression(self.compression)
            .socket_options(self.socket.build())
            .disable_metrics_export();

        if let Some(credentials) = &self.credentials {
            builder = builder.credentials(AuthCredentials {
                username: credentials.username.clone(),
                password: credentials.password.clone().unwrap_or_default(),
            });
        }

        if let Some(tls) = &self.tls {
            builder = builder.tls(tls.build()?);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Assemble(Box::new(e)))?;

        // Key registrations by the resolved name so multiple clients in one
        // host process cannot collide.
        let cluster_name = client.cluster_name();

        environment.manage(Arc::new(ManagedCluster::new(
            client.clone(),
            self.shutdown_timeout,
        )));
        environment.register_metrics(&format!("cassandra-{cluster_name}"), client.metrics());
        environment.register_health_check(
            &format!("cassandra-{cluster_name}"),
            Arc::new(CassandraHealthCheck::new(client.clone())),
        );

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_driver_defaults() {
        let config = ClusterConfig::default();

        assert_eq!(config.port, 9042);
        assert_eq!(config.compression, Compression::None);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(config.socket.connect_timeout, Duration::from_millis(5_000));
        assert_eq!(config.socket.read_timeout, Duration::from_millis(12_000));
        assert!(config.credentials.is_none());
        assert!(config.tls.is_none());
    }

    #[test]
    fn absent_socket_fields_stay_absent() {
        let options = SocketConfig::default().build();

        assert_eq!(options.connect_timeout_ms, 5_000);
        assert_eq!(options.read_timeout_ms, 12_000);
        assert_eq!(options.keep_alive, None);
        assert_eq!(options.reuse_address, None);
        assert_eq!(options.linger_secs, None);
        assert_eq!(options.no_delay, None);
        assert_eq!(options.receive_buffer_size, None);
        assert_eq!(options.send_buffer_size, None);
    }

    #[test]
    fn present_socket_fields_are_applied() {
        let config = SocketConfig {
            connect_timeout: Duration::from_millis(1_500),
            keep_alive: Some(true),
            reuse_address: Some(false),
            linger: Some(Duration::from_millis(2_700)),
            no_delay: Some(true),
            receive_buffer_size: Some(65_536),
            send_buffer_size: Some(0),
            ..SocketConfig::default()
        };

        let options = config.build();

        assert_eq!(options.connect_timeout_ms, 1_500);
        assert_eq!(options.keep_alive, Some(true));
        assert_eq!(options.reuse_address, Some(false));
        // Whole seconds, truncated.
        assert_eq!(options.linger_secs, Some(2));
        assert_eq!(options.no_delay, Some(true));
        assert_eq!(options.receive_buffer_size, Some(65_536));
        // An explicit zero is carried through, distinct from unset.
        assert_eq!(options.send_buffer_size, Some(0));
    }

    #[test]
    fn sub_millisecond_timeouts_truncate() {
        let config = SocketConfig {
            read_timeout: Duration::from_micros(2_999),
            ..SocketConfig::default()
        };

        assert_eq!(config.build().read_timeout_ms, 2);
    }

    #[test]
    fn validation_rejects_constraint_violations() {
        let ok = ClusterConfig {
            hosts: vec!["cassandra-1.internal".to_owned()],
            ..ClusterConfig::default()
        };
        assert!(ok.validate().is_ok());

        let no_hosts = ClusterConfig::default();
        assert!(matches!(
            no_hosts.validate(),
            Err(Error::InvalidConfig("hosts must not be empty"))
        ));

        let zero_port = ClusterConfig { port: 0, ..ok.clone() };
        assert!(matches!(zero_port.validate(), Err(Error::InvalidConfig(_))));

        let empty_username = ClusterConfig {
            credentials: Some(Credentials {
                username: String::new(),
                password: None,
            }),
            ..ok.clone()
        };
        assert!(matches!(
            empty_username.validate(),
            Err(Error::InvalidConfig("username must not be empty"))
        ));

        let zero_shutdown = ClusterConfig {
            shutdown_timeout: Duration::ZERO,
            ..ok.clone()
        };
        assert!(matches!(
            zero_shutdown.validate(),
            Err(Error::InvalidConfig(_))
        ));

        let sub_ms_connect = ClusterConfig {
            socket: SocketConfig {
                connect_timeout: Duration::from_micros(500),
                ..SocketConfig::default()
            },
            ..ok
        };
        assert!(matches!(
            sub_ms_connect.validate(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn deserializes_documents_with_defaults() {
        let config: ClusterConfig = serde_json::from_str(
            r#"{
                "hosts": ["10.0.0.1", "10.0.0.2"],
                "compression": "lz4",
                "credentials": {"username": "app"},
                "socket": {"connect_timeout": "250ms", "no_delay": true},
                "shutdown_timeout": "1m"
            }"#,
        )
        .unwrap();

        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.port, 9042);
        assert_eq!(config.compression, Compression::Lz4);
        assert_eq!(config.credentials.unwrap().password, None);
        assert_eq!(config.socket.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.socket.no_delay, Some(true));
        assert_eq!(config.socket.keep_alive, None);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(60));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<ClusterConfig, _> =
            serde_json::from_str(r#"{"hosts": ["10.0.0.1"], "keyspace": "orders"}"#);

        assert!(result.is_err());
    }
}
