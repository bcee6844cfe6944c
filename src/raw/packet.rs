//! Probe construction and reply decoding.
//!
//! Probes are bare IPv4 + TCP segments (no options, no payload) handed to a
//! layer-3 raw socket. Replies are decoded from captured link-layer frames.

use crate::error::{ScanError, ScanResult};
use crate::scanner::PortStatus;
use pnet::datalink::NetworkInterface;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, Ipv4Flags, Ipv4Packet, MutableIpv4Packet};
use pnet::packet::tcp::{self, MutableTcpPacket, TcpFlags, TcpPacket};
use pnet::packet::Packet;
use rand::Rng;
use std::fmt;
use std::net::Ipv4Addr;

pub const IPV4_HEADER_LEN: usize = 20;
pub const TCP_HEADER_LEN: usize = 20;

/// TTL stamped on outgoing probes.
pub const PROBE_TTL: u8 = 64;
/// Advertised window on outgoing probes.
pub const PROBE_WINDOW: u16 = 14600;

const EPHEMERAL_START: u16 = 49152;

/// One crafted segment and the identifiers needed to match its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub source_port: u16,
    pub target_port: u16,
    pub sequence: u32,
    pub flags: u8,
}

impl Probe {
    pub fn new(source_port: u16, target_port: u16, sequence: u32, flags: u8) -> Self {
        Self {
            source_port,
            target_port,
            sequence,
            flags,
        }
    }

    /// Key a reply to this probe carries: (reply source port, reply destination port).
    pub fn reply_key(&self) -> (u16, u16) {
        (self.target_port, self.source_port)
    }

    /// Acknowledgement number a reply must carry when its ACK flag is set.
    ///
    /// SYN and FIN each occupy one sequence number.
    pub fn expected_ack(&self) -> u32 {
        let mut consumed = 0u32;
        if self.flags & TcpFlags::SYN != 0 {
            consumed += 1;
        }
        if self.flags & TcpFlags::FIN != 0 {
            consumed += 1;
        }
        self.sequence.wrapping_add(consumed)
    }
}

/// Pick a random source port from the ephemeral range, leaving room for
/// `span` consecutive ports above it.
pub fn ephemeral_port(span: u16) -> u16 {
    rand::thread_rng().gen_range(EPHEMERAL_START..=u16::MAX - span)
}

/// Random initial sequence number.
pub fn initial_sequence() -> u32 {
    rand::random()
}

/// Serialize a probe into an IPv4 packet with valid checksums.
pub fn build_probe(source: Ipv4Addr, target: Ipv4Addr, probe: &Probe) -> ScanResult<Vec<u8>> {
    let mut buffer = vec![0u8; IPV4_HEADER_LEN + TCP_HEADER_LEN];

    {
        let mut ip = MutableIpv4Packet::new(&mut buffer)
            .ok_or_else(|| ScanError::InvalidPacket("failed to create IPv4 header".into()))?;

        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_dscp(0);
        ip.set_ecn(0);
        ip.set_total_length((IPV4_HEADER_LEN + TCP_HEADER_LEN) as u16);
        ip.set_identification(rand::random());
        ip.set_flags(Ipv4Flags::DontFragment);
        ip.set_fragment_offset(0);
        ip.set_ttl(PROBE_TTL);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
        ip.set_source(source);
        ip.set_destination(target);
        let checksum = ipv4::checksum(&ip.to_immutable());
        ip.set_checksum(checksum);
    }

    {
        let mut segment = MutableTcpPacket::new(&mut buffer[IPV4_HEADER_LEN..])
            .ok_or_else(|| ScanError::InvalidPacket("failed to create TCP header".into()))?;

        segment.set_source(probe.source_port);
        segment.set_destination(probe.target_port);
        segment.set_sequence(probe.sequence);
        segment.set_acknowledgement(0);
        segment.set_data_offset(5);
        segment.set_reserved(0);
        segment.set_flags(probe.flags);
        segment.set_window(PROBE_WINDOW);
        segment.set_urgent_ptr(0);
        let checksum = tcp::ipv4_checksum(&segment.to_immutable(), &source, &target);
        segment.set_checksum(checksum);
    }

    Ok(buffer)
}

/// Header fields of a captured TCP segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
    pub flags: u8,
    pub window: u16,
    pub ttl: u8,
}

impl Reply {
    pub fn key(&self) -> (u16, u16) {
        (self.source_port, self.destination_port)
    }

    pub fn is_syn_ack(&self) -> bool {
        let mask = TcpFlags::SYN | TcpFlags::ACK;
        self.flags & mask == mask
    }

    pub fn is_rst(&self) -> bool {
        self.flags & TcpFlags::RST != 0
    }

    pub fn has_ack(&self) -> bool {
        self.flags & TcpFlags::ACK != 0
    }

    /// SYN/ACK means open, RST means closed, anything else says nothing.
    pub fn port_status(&self) -> Option<PortStatus> {
        if self.is_syn_ack() {
            Some(PortStatus::Open)
        } else if self.is_rst() {
            Some(PortStatus::Closed)
        } else {
            None
        }
    }
}

/// Link-layer header carried by captured frames on one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFraming {
    Ethernet,
    /// Point-to-point and tunnel devices hand over the IP packet unwrapped.
    BareIp,
}

impl LinkFraming {
    pub fn for_interface(interface: &NetworkInterface) -> Self {
        if interface.is_point_to_point() || interface.mac.is_none() {
            Self::BareIp
        } else {
            Self::Ethernet
        }
    }
}

/// Decode a captured frame into a TCP reply.
pub fn decode_frame(frame: &[u8], framing: LinkFraming) -> Option<Reply> {
    match framing {
        LinkFraming::Ethernet => {
            let eth = EthernetPacket::new(frame)?;
            if eth.get_ethertype() != EtherTypes::Ipv4 {
                return None;
            }
            decode_ipv4(eth.payload())
        }
        LinkFraming::BareIp => decode_ipv4(frame),
    }
}

/// Decode an IPv4 packet carrying TCP.
pub fn decode_ipv4(bytes: &[u8]) -> Option<Reply> {
    let ip = Ipv4Packet::new(bytes)?;
    if ip.get_version() != 4 || ip.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return None;
    }
    let segment = TcpPacket::new(ip.payload())?;

    Some(Reply {
        source: ip.get_source(),
        destination: ip.get_destination(),
        source_port: segment.get_source(),
        destination_port: segment.get_destination(),
        sequence: segment.get_sequence(),
        acknowledgement: segment.get_acknowledgement(),
        flags: segment.get_flags(),
        window: segment.get_window(),
        ttl: ip.get_ttl(),
    })
}

/// Capture predicate: TCP traffic sourced from the target host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFilter {
    source: Ipv4Addr,
}

impl CaptureFilter {
    pub fn new(source: Ipv4Addr) -> Self {
        Self { source }
    }

    pub fn matches(&self, reply: &Reply) -> bool {
        reply.source == self.source
    }
}

impl fmt::Display for CaptureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp and src host {}", self.source)
    }
}
