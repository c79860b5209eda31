use std::collections::HashSet;
use std::sync::Arc;

use plinth_cql::{DEFAULT_CIPHER_SUITES, TlsOptions};
use rustls::crypto::{CryptoProvider, aws_lc_rs};
use rustls::{ClientConfig, RootCertStore};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// TLS settings for connections to the cluster.
///
/// The effective cipher-suite list is the driver's default enabled list
/// minus the exclusions, in original preference order.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsConfig {
    /// Cipher-suite names removed from the driver's default enabled set.
    pub excluded_cipher_suites: HashSet<String>,
}

impl TlsConfig {
    /// Derives TLS options: a client context over the platform's default
    /// trust anchors, restricted to the effective cipher suites. No client
    /// certificate and no custom trust store are configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCipherSuitesEnabled`] when the exclusions cover
    /// the whole default list, [`Error::TlsEnvironment`] when the platform
    /// provider cannot satisfy the effective list at all, and
    /// [`Error::TlsConfig`] when the context parameters are rejected.
    pub fn build(&self) -> Result<TlsOptions, Error> {
        let cipher_suites = effective_cipher_suites(&self.excluded_cipher_suites);
        if cipher_suites.is_empty() {
            return Err(Error::NoCipherSuitesEnabled);
        }

        let base = aws_lc_rs::default_provider();
        let enabled = base
            .cipher_suites
            .iter()
            .filter(|suite| {
                let name = format!("{:?}", suite.suite());
                cipher_suites.iter().any(|enabled| *enabled == name)
            })
            .copied()
            .collect::<Vec<_>>();

        if enabled.is_empty() {
            return Err(Error::TlsEnvironment(
                "platform provider supports none of the enabled cipher suites",
            ));
        }

        let provider = CryptoProvider {
            cipher_suites: enabled,
            ..base
        };

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder_with_provider(Arc::new(provider))
            .with_safe_default_protocol_versions()
            .map_err(Error::TlsConfig)?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(TlsOptions {
            config: Arc::new(config),
            cipher_suites,
        })
    }
}

/// Filters the driver's default cipher-suite list by `excluded`,
/// preserving preference order.
#[must_use]
pub fn effective_cipher_suites(excluded: &HashSet<String>) -> Vec<String> {
    DEFAULT_CIPHER_SUITES
        .iter()
        .filter(|suite| !excluded.contains(**suite))
        .map(|suite| (*suite).to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excluded(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn no_exclusions_is_identity() {
        assert_eq!(
            effective_cipher_suites(&HashSet::new()),
            DEFAULT_CIPHER_SUITES
        );
    }

    #[test]
    fn exclusions_remove_members_preserving_order() {
        let effective = effective_cipher_suites(&excluded(&[
            "TLS13_AES_128_GCM_SHA256",
            "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        ]));

        assert_eq!(effective.len(), DEFAULT_CIPHER_SUITES.len() - 2);
        assert!(!effective.contains(&"TLS13_AES_128_GCM_SHA256".to_owned()));

        // Remaining suites keep their relative order.
        let expected = DEFAULT_CIPHER_SUITES
            .iter()
            .filter(|suite| {
                **suite != "TLS13_AES_128_GCM_SHA256"
                    && **suite != "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384"
            })
            .map(|suite| (*suite).to_owned())
            .collect::<Vec<_>>();
        assert_eq!(effective, expected);
    }

    #[test]
    fn unknown_exclusions_are_ignored() {
        let effective = effective_cipher_suites(&excluded(&["TLS_NOT_A_REAL_SUITE"]));

        assert_eq!(effective, DEFAULT_CIPHER_SUITES);
    }

    #[test]
    fn excluding_everything_is_a_configuration_error() {
        let config = TlsConfig {
            excluded_cipher_suites: excluded(DEFAULT_CIPHER_SUITES),
        };

        assert!(matches!(config.build(), Err(Error::NoCipherSuitesEnabled)));
    }

    #[test]
    fn derives_context_restricted_to_effective_suites() {
        let options = TlsConfig::default().build().unwrap();

        assert_eq!(options.cipher_suites, DEFAULT_CIPHER_SUITES);
    }

    #[test]
    fn derives_context_with_exclusions() {
        let config = TlsConfig {
            excluded_cipher_suites: excluded(&["TLS13_CHACHA20_POLY1305_SHA256"]),
        };

        let options = config.build().unwrap();

        assert_eq!(options.cipher_suites.len(), DEFAULT_CIPHER_SUITES.len() - 1);
    }
}
