//! Egress interface discovery.
//!
//! The kernel's routing decision is read back by connecting a throwaway UDP
//! socket toward the target (no datagram is sent) and inspecting its local
//! endpoint. The interface carrying that address is the one to capture on.

use crate::error::{ScanError, ScanResult};
use pnet::datalink::{self, NetworkInterface};
use std::net::{IpAddr, Ipv4Addr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Interface and source address used to reach a target.
#[derive(Debug, Clone)]
pub struct Egress {
    pub interface: NetworkInterface,
    pub source: Ipv4Addr,
}

/// Find the interface and source address the kernel would use for `target`.
pub async fn discover_egress(target: Ipv4Addr) -> ScanResult<Egress> {
    let source = local_address_toward(target).await?;
    let interface = find_interface_for(&datalink::interfaces(), source)?;

    debug!(interface = %interface.name, %source, %target, "resolved egress");
    Ok(Egress { interface, source })
}

async fn local_address_toward(target: Ipv4Addr) -> ScanResult<Ipv4Addr> {
    let discovery_failed =
        |e: std::io::Error| ScanError::InterfaceNotFound(format!("no route to {target}: {e}"));

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(discovery_failed)?;
    socket.connect((target, 80)).await.map_err(discovery_failed)?;
    let local = socket.local_addr().map_err(discovery_failed)?;

    match local.ip() {
        IpAddr::V4(addr) => Ok(addr),
        IpAddr::V6(addr) => Err(ScanError::InterfaceNotFound(format!(
            "route to {target} uses IPv6 source {addr}"
        ))),
    }
}

/// Pick the interface that carries `source`.
pub fn find_interface_for(
    interfaces: &[NetworkInterface],
    source: Ipv4Addr,
) -> ScanResult<NetworkInterface> {
    interfaces
        .iter()
        .find(|iface| iface.ips.iter().any(|net| net.ip() == IpAddr::V4(source)))
        .cloned()
        .ok_or_else(|| {
            ScanError::InterfaceNotFound(format!("no local interface carries {source}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_source_has_no_interface() {
        let interfaces = datalink::interfaces();
        let err = find_interface_for(&interfaces, Ipv4Addr::new(203, 0, 113, 77)).unwrap_err();
        assert!(matches!(err, ScanError::InterfaceNotFound(_)));
    }

    #[test]
    fn test_loopback_is_found_when_present() {
        let interfaces = datalink::interfaces();
        let has_loopback = interfaces
            .iter()
            .any(|i| i.ips.iter().any(|n| n.ip() == IpAddr::V4(Ipv4Addr::LOCALHOST)));

        // containers without a configured loopback skip the positive check
        if has_loopback {
            let iface = find_interface_for(&interfaces, Ipv4Addr::LOCALHOST).unwrap();
            assert!(iface.is_loopback());
        }
    }

    #[tokio::test]
    async fn test_loopback_route() {
        let source = local_address_toward(Ipv4Addr::LOCALHOST).await.unwrap();
        assert!(source.is_loopback());
    }
}
