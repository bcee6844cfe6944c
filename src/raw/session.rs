//! One raw probing session against a single target.

use super::capture::Listener;
use super::correlate::Correlator;
use super::interface::{discover_egress, Egress};
use super::packet::{build_probe, CaptureFilter, LinkFraming, Probe};
use crate::error::{ScanError, ScanResult};
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, NetworkInterface};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::transport::{transport_channel, TransportChannelType, TransportSender};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing::{debug, trace, warn};

const CAPTURE_POLL: Duration = Duration::from_millis(50);
const SEND_BUFFER: usize = 4096;

/// Capture handle plus raw sender, bound to one target.
///
/// Both handles are released when the session is consumed by
/// [`RawSession::exchange`] or dropped.
pub struct RawSession {
    target: Ipv4Addr,
    egress: Egress,
    framing: LinkFraming,
    sender: TransportSender,
    receiver: Box<dyn DataLinkReceiver>,
}

impl RawSession {
    /// Discover the egress path and open the capture and send handles.
    pub async fn open(target: Ipv4Addr) -> ScanResult<Self> {
        let egress = discover_egress(target).await?;
        let receiver = open_capture(&egress.interface)?;
        let framing = LinkFraming::for_interface(&egress.interface);

        let (sender, _) = transport_channel(
            SEND_BUFFER,
            TransportChannelType::Layer3(IpNextHeaderProtocols::Tcp),
        )
        .map_err(|e| privilege_aware(e, ScanError::RawSocket))?;

        Ok(Self {
            target,
            egress,
            framing,
            sender,
            receiver,
        })
    }

    /// Local address probes are sent from.
    pub fn source(&self) -> Ipv4Addr {
        self.egress.source
    }

    /// Send every probe in order, then collect replies until `wait` elapses
    /// or every probe is answered.
    pub async fn exchange(self, probes: &[Probe], wait: Duration) -> ScanResult<Correlator> {
        let Self {
            target,
            egress,
            framing,
            mut sender,
            receiver,
        } = self;

        let packets = probes
            .iter()
            .map(|probe| build_probe(egress.source, target, probe))
            .collect::<ScanResult<Vec<_>>>()?;

        let filter = CaptureFilter::new(target);
        debug!(
            interface = %egress.interface.name,
            %filter,
            ?framing,
            probes = probes.len(),
            "starting capture"
        );
        let listener = Listener::spawn(receiver, framing, Correlator::new(filter, probes));

        for (probe, bytes) in probes.iter().zip(&packets) {
            let Some(packet) = Ipv4Packet::new(bytes) else {
                continue;
            };
            match sender.send_to(packet, IpAddr::V4(target)) {
                Ok(_) => trace!(port = probe.target_port, flags = probe.flags, "probe sent"),
                Err(e) => warn!(port = probe.target_port, error = %e, "probe send failed"),
            }
        }

        let table = listener.finish(wait).await?;
        debug!(
            answered = table.answered(),
            probes = probes.len(),
            "capture finished"
        );
        Ok(table)
    }
}

fn open_capture(interface: &NetworkInterface) -> ScanResult<Box<dyn DataLinkReceiver>> {
    let config = Config {
        read_timeout: Some(CAPTURE_POLL),
        promiscuous: false,
        ..Default::default()
    };

    match datalink::channel(interface, config) {
        Ok(Channel::Ethernet(_tx, rx)) => Ok(rx),
        Ok(_) => Err(ScanError::Capture(format!(
            "unsupported channel type on {}",
            interface.name
        ))),
        Err(e) => Err(privilege_aware(e, ScanError::Capture)),
    }
}

/// Map an I/O error to `PermissionDenied` when it is a privilege problem.
fn privilege_aware(e: std::io::Error, otherwise: fn(String) -> ScanError) -> ScanError {
    let message = e.to_string();
    if e.kind() == std::io::ErrorKind::PermissionDenied
        || message.to_lowercase().contains("operation not permitted")
    {
        ScanError::PermissionDenied(
            "raw socket access requires root/sudo privileges".to_string(),
        )
    } else {
        otherwise(message)
    }
}
