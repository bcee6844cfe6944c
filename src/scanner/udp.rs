//! UDP Scanner implementation.
//!
//! Sends one fixed datagram per port and waits for any reply within the
//! remaining deadline. UDP scanning is inherently less reliable than TCP
//! scanning due to the connectionless nature of UDP.
//!
//! # Detection Methods
//!
//! 1. **UDP Response**: If any data is received, port is open
//! 2. **ICMP Port Unreachable**: surfaced by the kernel as a refused
//!    receive on the connected socket; port is closed
//! 3. **No Response**: Port is either open or filtered (ambiguous)
//!
//! Only open ports are reported unless the request asks for closed ports,
//! in which case refusals and silence appear as `closed` and
//! `open|filtered`.

use crate::error::ScanResult;
use crate::scanner::pool::ExecutionPool;
use crate::scanner::traits::{PortResult, PortStatus, ScanType, Scanner};
use crate::scanner::ScanRequest;
use crate::types::{Port, ScanTarget};
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

/// Fixed-length probe sent to every port.
pub const PROBE_PAYLOAD: &[u8; 8] = b"\r\n\0\0\0\0\0\0";

/// UDP Scanner for detecting open UDP ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpScanner;

impl UdpScanner {
    pub fn new() -> Self {
        Self
    }

    /// Probe a single port. The socket is released on every exit path.
    pub async fn probe_port(
        target: IpAddr,
        port: Port,
        limit: Duration,
        show_closed: bool,
    ) -> Option<PortResult> {
        let status = match Self::exchange(target, port, limit).await {
            Ok(status) => status,
            Err(e) => {
                trace!(%port, error = %e, "udp probe failed");
                return None;
            }
        };

        match status {
            PortStatus::Open => Some(PortResult::new(port, status)),
            _ if show_closed => Some(PortResult::new(port, status)),
            _ => None,
        }
    }

    async fn exchange(target: IpAddr, port: Port, limit: Duration) -> io::Result<PortStatus> {
        let deadline = Instant::now() + limit;
        let local: SocketAddr = match target {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(SocketAddr::new(target, port.as_u16())).await?;

        match timeout_at(deadline, socket.send(PROBE_PAYLOAD)).await {
            Ok(sent) => {
                sent?;
            }
            Err(_) => return Ok(PortStatus::OpenFiltered),
        }

        let mut buf = [0u8; 1024];
        match timeout_at(deadline, socket.recv(&mut buf)).await {
            Ok(Ok(_)) => Ok(PortStatus::Open),
            Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => Ok(PortStatus::Closed),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(PortStatus::OpenFiltered),
        }
    }
}

#[async_trait]
impl Scanner for UdpScanner {
    fn scan_type(&self) -> ScanType {
        ScanType::Udp
    }

    async fn scan(&self, request: &ScanRequest) -> ScanResult<Vec<PortResult>> {
        let target = ScanTarget::resolve(request.target()).await?;
        let ip = target.ip;
        let limit = request.timeout();
        let show_closed = request.show_closed();

        debug!(%target, ports = request.ports().len(), "starting udp scan");

        let pool = ExecutionPool::new(request.max_concurrency());
        let results = pool
            .run(request.ports(), |port| {
                Self::probe_port(ip, port, limit, show_closed)
            })
            .await;

        debug!(%target, reported = results.len(), "udp scan complete");
        Ok(results)
    }
}
