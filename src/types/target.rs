//! Target resolution.
//!
//! A target is a hostname or a literal IP address. Literal addresses are
//! used as-is; hostnames go through the async DNS resolver.

use crate::error::{ScanError, ScanResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// A single scan target that has been resolved to an IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget {
    /// The original input (hostname or IP string).
    pub original: String,
    /// The resolved IP address.
    pub ip: IpAddr,
}

impl ScanTarget {
    /// Create a new scan target.
    pub fn new(original: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            original: original.into(),
            ip,
        }
    }

    /// Resolve a host string to its first address.
    pub async fn resolve(host: &str) -> ScanResult<Self> {
        let ips = lookup(host).await?;
        ips.into_iter()
            .next()
            .map(|ip| Self::new(host, ip))
            .ok_or_else(|| ScanError::NoAddress(host.to_string()))
    }

    /// Resolve a host string to its first IPv4 address.
    ///
    /// The raw packet pipeline only speaks IPv4.
    pub async fn resolve_v4(host: &str) -> ScanResult<(Self, Ipv4Addr)> {
        let ips = lookup(host).await?;
        if ips.is_empty() {
            return Err(ScanError::NoAddress(host.to_string()));
        }
        ips.into_iter()
            .find_map(|ip| match ip {
                IpAddr::V4(v4) => Some((Self::new(host, ip), v4)),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| {
                ScanError::UnsupportedTarget(format!("{host} has no IPv4 address"))
            })
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

async fn lookup(host: &str) -> ScanResult<Vec<IpAddr>> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ScanError::NoAddress(String::new()));
    }

    // bracketed IPv6 literals are accepted for convenience
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }

    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
    let response = resolver
        .lookup_ip(host)
        .await
        .map_err(|e| ScanError::Resolution {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    Ok(response.iter().collect())
}
