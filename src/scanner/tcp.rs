//! TCP Connect Scanner implementation.
//!
//! Performs standard TCP connect scans using the operating system's
//! socket API. This is the most reliable scanning method but also
//! the most detectable as it completes the full TCP handshake.

use crate::error::ScanResult;
use crate::scanner::pool::ExecutionPool;
use crate::scanner::traits::{PortResult, PortStatus, ScanType, Scanner};
use crate::scanner::ScanRequest;
use crate::types::{Port, ScanTarget};
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

/// TCP Connect Scanner.
///
/// Uses standard socket connect() calls to determine port status.
/// Does not require elevated privileges.
///
/// A completed handshake means open. Every failure (refusal, timeout,
/// unreachable) leaves the port out of the results: this strategy does not
/// tell closed from filtered.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnectScanner;

impl TcpConnectScanner {
    pub fn new() -> Self {
        Self
    }

    /// Attempt one timed handshake. The stream is closed immediately.
    pub async fn probe_port(target: IpAddr, port: Port, limit: Duration) -> Option<PortResult> {
        let addr = SocketAddr::new(target, port.as_u16());

        match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                trace!(%port, "connect succeeded");
                Some(PortResult::new(port, PortStatus::Open))
            }
            Ok(Err(e)) => {
                trace!(%port, error = %e, "connect failed");
                None
            }
            Err(_) => {
                trace!(%port, "connect timed out");
                None
            }
        }
    }
}

#[async_trait]
impl Scanner for TcpConnectScanner {
    fn scan_type(&self) -> ScanType {
        ScanType::Connect
    }

    async fn scan(&self, request: &ScanRequest) -> ScanResult<Vec<PortResult>> {
        let target = ScanTarget::resolve(request.target()).await?;
        let ip = target.ip;
        let limit = request.timeout();

        debug!(%target, ports = request.ports().len(), "starting connect scan");

        let pool = ExecutionPool::new(request.max_concurrency());
        let results = pool
            .run(request.ports(), |port| Self::probe_port(ip, port, limit))
            .await;

        debug!(%target, open = results.len(), "connect scan complete");
        Ok(results)
    }
}
