//! SYN (Stealth) Scanner implementation.
//!
//! Performs half-open TCP scanning by sending SYN packets and analyzing
//! responses without completing the TCP handshake. This method is less
//! detectable than full connect scans but requires raw socket access
//! (elevated privileges).
//!
//! # How It Works
//!
//! 1. Open one capture handle on the egress interface, filtered to TCP
//!    from the target
//! 2. Send one SYN per port from a single random source port
//! 3. Analyze the replies matched by full tuple:
//!    - SYN/ACK: Port is open (service is listening)
//!    - RST: Port is closed (no service)
//!    - No response: Port may be filtered (not reported)

use crate::error::ScanResult;
use crate::raw::{self, Correlator, Probe, RawSession};
use crate::scanner::traits::{PortResult, PortStatus, ScanType, Scanner};
use crate::scanner::ScanRequest;
use crate::types::{Port, ScanTarget};
use async_trait::async_trait;
use pnet::packet::tcp::TcpFlags;
use tracing::debug;

/// SYN Scanner for stealth port scanning.
///
/// **Requires elevated privileges (root/sudo).** IPv4 targets only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynScanner;

impl SynScanner {
    pub fn new() -> Self {
        Self
    }

    /// One SYN per port, all from `source_port` with a shared sequence.
    pub fn probes(ports: &[Port], source_port: u16, sequence: u32) -> Vec<Probe> {
        ports
            .iter()
            .map(|port| Probe::new(source_port, port.as_u16(), sequence, TcpFlags::SYN))
            .collect()
    }

    /// Turn matched replies into results, in probe order.
    ///
    /// Open ports are always reported. Closed ports only when asked for.
    /// Unanswered probes never appear.
    pub fn interpret(probes: &[Probe], replies: &Correlator, show_closed: bool) -> Vec<PortResult> {
        probes
            .iter()
            .filter_map(|probe| {
                let status = replies.reply_for(probe)?.port_status()?;
                let port = Port::new(probe.target_port)?;
                match status {
                    PortStatus::Open => Some(PortResult::new(port, status)),
                    _ if show_closed => Some(PortResult::new(port, status)),
                    _ => None,
                }
            })
            .collect()
    }
}

#[async_trait]
impl Scanner for SynScanner {
    fn scan_type(&self) -> ScanType {
        ScanType::Syn
    }

    async fn scan(&self, request: &ScanRequest) -> ScanResult<Vec<PortResult>> {
        if !raw::is_privileged() {
            debug!("not running as root, raw socket access will likely fail");
        }

        let (target, ip) = ScanTarget::resolve_v4(request.target()).await?;
        let session = RawSession::open(ip).await?;

        let source_port = raw::ephemeral_port(0);
        let probes = Self::probes(request.ports(), source_port, raw::initial_sequence());

        debug!(
            %target,
            source = %session.source(),
            source_port,
            ports = probes.len(),
            "starting syn scan"
        );

        let replies = session.exchange(&probes, request.timeout()).await?;
        let results = Self::interpret(&probes, &replies, request.show_closed());

        debug!(%target, reported = results.len(), "syn scan complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{CaptureFilter, Reply};
    use std::net::Ipv4Addr;

    const LOCAL: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 10);
    const TARGET: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 7);

    fn ports(list: &[u16]) -> Vec<Port> {
        list.iter().filter_map(|&p| Port::new(p)).collect()
    }

    fn reply(probe: &Probe, flags: u8) -> Reply {
        Reply {
            source: TARGET,
            destination: LOCAL,
            source_port: probe.target_port,
            destination_port: probe.source_port,
            sequence: 7,
            acknowledgement: probe.expected_ack(),
            flags,
            window: 29200,
            ttl: 64,
        }
    }

    #[test]
    fn test_scanner_type() {
        let scanner = SynScanner::new();
        assert!(scanner.requires_privileges());
        assert_eq!(scanner.scan_type(), ScanType::Syn);
    }

    #[test]
    fn test_probes_share_source_port() {
        let probes = SynScanner::probes(&ports(&[22, 80, 443]), 50000, 1234);
        assert_eq!(probes.len(), 3);
        assert!(probes.iter().all(|p| p.source_port == 50000));
        assert!(probes.iter().all(|p| p.flags == TcpFlags::SYN));
        assert_eq!(probes[1].target_port, 80);
    }

    #[test]
    fn test_interpret_open_and_closed() {
        let probes = SynScanner::probes(&ports(&[22, 80, 443]), 50000, 1234);
        let mut table = Correlator::new(CaptureFilter::new(TARGET), &probes);
        table.record(reply(&probes[0], TcpFlags::SYN | TcpFlags::ACK));
        table.record(reply(&probes[1], TcpFlags::RST | TcpFlags::ACK));

        let open_only = SynScanner::interpret(&probes, &table, false);
        assert_eq!(open_only.len(), 1);
        assert_eq!(open_only[0].port.as_u16(), 22);
        assert_eq!(open_only[0].status, PortStatus::Open);

        let all = SynScanner::interpret(&probes, &table, true);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].port.as_u16(), 80);
        assert_eq!(all[1].status, PortStatus::Closed);
    }

    #[test]
    fn test_unanswered_probes_are_absent() {
        let probes = SynScanner::probes(&ports(&[8080]), 50000, 1);
        let table = Correlator::new(CaptureFilter::new(TARGET), &probes);
        assert!(SynScanner::interpret(&probes, &table, true).is_empty());
    }
}
