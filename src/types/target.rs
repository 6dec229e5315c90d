//! Scan target resolution.
//!
//! A scan runs against exactly one resolved address. The original host string
//! is kept alongside it because the banner probes need it for TLS server-name
//! validation and for the HTTP `Host:` header.

use std::fmt;
use std::net::IpAddr;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// A scan target that has been resolved to an IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanTarget {
    /// The original input (hostname or IP string).
    pub original: String,
    /// The resolved IP address.
    pub ip: IpAddr,
}

impl ScanTarget {
    pub fn new(original: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            original: original.into(),
            ip,
        }
    }

    /// Resolve a host identifier into a scan target.
    ///
    /// IP literals are taken as-is; anything else goes through DNS and the
    /// first returned address wins. Only an empty name is rejected up front;
    /// the resolver decides what else is a valid name.
    pub async fn resolve(host: &str) -> Result<Self, TargetError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(TargetError::InvalidFormat(host.to_string()));
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(Self::new(host, ip));
        }

        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            debug!(error = %e, "system resolver config unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });

        let response = resolver
            .lookup_ip(host)
            .await
            .map_err(|e| TargetError::DnsResolutionFailed(host.to_string(), e.to_string()))?;

        let ip = response
            .iter()
            .next()
            .ok_or_else(|| TargetError::NoAddressesFound(host.to_string()))?;

        debug!(%host, %ip, "resolved target");
        Ok(Self::new(host, ip))
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.original == self.ip.to_string() {
            write!(f, "{}", self.ip)
        } else {
            write!(f, "{} ({})", self.original, self.ip)
        }
    }
}

/// Error type for target parsing and resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target format: {0:?}")]
    InvalidFormat(String),
    #[error("failed to resolve hostname '{0}': {1}")]
    DnsResolutionFailed(String, String),
    #[error("no IP addresses found for hostname '{0}'")]
    NoAddressesFound(String),
}
