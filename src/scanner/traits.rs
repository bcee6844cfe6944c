//! The strategy seam and the result types every strategy produces.

use crate::error::ScanResult;
use crate::scanner::ScanRequest;
use crate::services::service_name;
use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Observed state of one port.
///
/// Unreachable or silent ports have no state at all: strategies leave them
/// out of their results instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Open,
    /// A definitive refusal: RST, or ICMP port unreachable for UDP.
    Closed,
    /// UDP silence, which a dropping firewall produces just as well.
    #[serde(rename = "open|filtered")]
    OpenFiltered,
}

impl PortStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::OpenFiltered => "open|filtered",
        }
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortResult {
    pub port: Port,
    pub status: PortStatus,
    /// Well-known service label, `"unknown"` when the port has none.
    pub service: String,
}

impl PortResult {
    pub fn new(port: Port, status: PortStatus) -> Self {
        Self {
            port,
            status,
            service: service_name(port.as_u16()).to_string(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PortStatus::Open
    }
}

/// Built-in probing methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    /// Full TCP handshake, unprivileged
    #[default]
    Connect,
    /// One datagram per port
    Udp,
    /// Half-open SYN probes, needs root
    Syn,
    /// Service vote plus probe fingerprint, needs root
    Os,
}

impl ScanType {
    /// Raw socket access is needed.
    pub fn requires_privileges(self) -> bool {
        matches!(self, Self::Syn | Self::Os)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Connect => "TCP Connect",
            Self::Udp => "UDP",
            Self::Syn => "SYN Stealth",
            Self::Os => "OS Detection",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScanType {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let scan_type = match name.to_ascii_lowercase().as_str() {
            "connect" | "tcp" => Self::Connect,
            "udp" => Self::Udp,
            "syn" | "stealth" => Self::Syn,
            "os" | "os-detect" => Self::Os,
            other => return Err(format!("no scan type named '{other}'")),
        };
        Ok(scan_type)
    }
}

/// A probing method.
///
/// Receives a validated, immutable request and returns one result per port
/// it judged reachable, in no particular order. Per-port I/O failures are
/// "no evidence", not errors; only whole-scan failures (resolution,
/// interface discovery, capture setup) come back as `Err`.
///
/// ```ignore
/// use gort::scanner::{Scanner, ScanRequest};
///
/// async fn open_ports<S: Scanner>(scanner: &S, request: &ScanRequest) -> usize {
///     scanner.scan(request).await.map(|r| r.len()).unwrap_or(0)
/// }
/// ```
#[async_trait]
pub trait Scanner: Send + Sync {
    fn scan_type(&self) -> ScanType;

    fn requires_privileges(&self) -> bool {
        self.scan_type().requires_privileges()
    }

    async fn scan(&self, request: &ScanRequest) -> ScanResult<Vec<PortResult>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names_match_serde() {
        for status in [PortStatus::Open, PortStatus::Closed, PortStatus::OpenFiltered] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_scan_type_aliases() {
        let cases = [
            ("connect", ScanType::Connect),
            ("TCP", ScanType::Connect),
            ("udp", ScanType::Udp),
            ("stealth", ScanType::Syn),
            ("os-detect", ScanType::Os),
        ];
        for (name, expected) in cases {
            assert_eq!(name.parse::<ScanType>(), Ok(expected));
        }
        assert!("fin".parse::<ScanType>().is_err());
        assert_eq!(ScanType::Syn.to_string(), "SYN Stealth");
    }

    #[test]
    fn test_port_result_looks_up_service() {
        let http = PortResult::new(Port::new(80).unwrap(), PortStatus::Open);
        assert!(http.is_open());
        assert_eq!(http.service, "HTTP");

        let unknown = PortResult::new(Port::new(1).unwrap(), PortStatus::Closed);
        assert!(!unknown.is_open());
        assert_eq!(unknown.service, "unknown");
    }

    #[test]
    fn test_privileged_types() {
        assert!(!ScanType::Connect.requires_privileges());
        assert!(!ScanType::Udp.requires_privileges());
        assert!(ScanType::Syn.requires_privileges());
        assert!(ScanType::Os.requires_privileges());
    }
}
