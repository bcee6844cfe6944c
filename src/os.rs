//! Operating-system inference.
//!
//! Two stateless heuristics over evidence gathered elsewhere:
//!
//! - [`vote_by_services`] lets each open, OS-indicative port vote for an OS
//!   family.
//! - [`fingerprint`] classifies the replies to a fixed probe battery by the
//!   observed TCP window size and IP TTL.
//!
//! Both are coarse signals, not a match against a reference fingerprint
//! database.

use pnet::packet::tcp::TcpFlags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much weight a guess deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
    #[serde(rename = "cannot-determine")]
    CannotDetermine,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::CannotDetermine => write!(f, "Cannot determine"),
        }
    }
}

/// Best guess at the remote operating system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsResult {
    pub os: String,
    pub confidence: Confidence,
    /// TTL of the reply the guess was based on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u8>,
    /// TCP window of the reply the guess was based on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<u16>,
}

impl OsResult {
    fn new(os: &str, confidence: Confidence) -> Self {
        Self {
            os: os.to_string(),
            confidence,
            ttl: None,
            window_size: None,
        }
    }
}

/// Flag combination carried by a fingerprint probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeKind {
    Syn,
    Fin,
    Xmas,
    Null,
}

impl ProbeKind {
    /// TCP flags set on the outgoing segment.
    pub fn flags(self) -> u8 {
        match self {
            Self::Syn => TcpFlags::SYN,
            Self::Fin => TcpFlags::FIN,
            Self::Xmas => TcpFlags::FIN | TcpFlags::PSH | TcpFlags::URG,
            Self::Null => 0,
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syn => write!(f, "SYN"),
            Self::Fin => write!(f, "FIN"),
            Self::Xmas => write!(f, "XMAS"),
            Self::Null => write!(f, "NULL"),
        }
    }
}

/// The fixed fingerprint battery, sent in this order.
pub const PROBE_BATTERY: [(ProbeKind, u16); 5] = [
    (ProbeKind::Syn, 80),
    (ProbeKind::Syn, 22),
    (ProbeKind::Fin, 80),
    (ProbeKind::Xmas, 80),
    (ProbeKind::Null, 80),
];

/// What a single probe told us about its port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeClass {
    /// SYN answered with SYN/ACK.
    Open,
    /// Answered with RST.
    Closed,
    /// Stealth probe left unanswered on a port a SYN probe found open.
    OpenFiltered,
    /// No usable evidence.
    NoResponse,
}

impl ProbeClass {
    /// Open or open|filtered.
    pub fn shows_open(self) -> bool {
        matches!(self, Self::Open | Self::OpenFiltered)
    }
}

/// Reply attributes observed for one probe of the battery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub kind: ProbeKind,
    /// Port on the target; source port of the reply.
    pub source_port: u16,
    pub ttl: Option<u8>,
    pub window_size: Option<u16>,
    pub flags: Option<u8>,
    pub classification: ProbeClass,
}

const LINUX_KERNEL_24: &str = "Linux/Unix (Kernel 2.4+)";
const LINUX_DISTRO: &str = "Linux (likely Debian/Ubuntu/CentOS)";

/// Guess the OS from the probe battery replies.
///
/// TTL and window come from the first reply that shows open evidence and
/// carries header values. Three or more open-evidence probes raise the
/// confidence to High.
pub fn fingerprint(responses: &[ProbeResponse]) -> OsResult {
    let open: Vec<&ProbeResponse> = responses
        .iter()
        .filter(|r| r.classification.shows_open())
        .collect();

    let Some(sample) = open
        .iter()
        .find(|r| r.ttl.is_some() && r.window_size.is_some())
    else {
        return OsResult::new("Unknown (no open ports detected)", Confidence::CannotDetermine);
    };

    let ttl = sample.ttl.unwrap_or_default();
    let window = sample.window_size.unwrap_or_default();

    let (os, confidence) = classify_window_ttl(window, ttl);
    let mut result = OsResult::new(os, confidence);
    result.ttl = Some(ttl);
    result.window_size = Some(window);

    if open.len() >= 3 {
        result.confidence = Confidence::High;
        if result.os == LINUX_KERNEL_24 {
            result.os = LINUX_DISTRO.to_string();
        }
    }

    result
}

fn classify_window_ttl(window: u16, ttl: u8) -> (&'static str, Confidence) {
    match window {
        64000.. => match ttl {
            0..=64 => (LINUX_KERNEL_24, Confidence::High),
            65..=128 => ("Windows XP/2000/2003", Confidence::Medium),
            _ => ("Windows Vista/7/8/10/11 or Linux", Confidence::Medium),
        },
        4000..=63999 => match ttl {
            0..=64 => ("Linux/Cisco/Solaris", Confidence::Medium),
            65..=128 => ("Windows Server 2008+ or FreeBSD", Confidence::Medium),
            _ => ("macOS or older Linux", Confidence::Low),
        },
        _ => ("Embedded/IoT device or Firewall", Confidence::Low),
    }
}

/// Ports whose presence hints at an OS family.
const SERVICE_SIGNATURES: &[(u16, &str)] = &[
    (22, "Linux/Unix"),
    (111, "Linux/Unix"),
    (2049, "Linux/Unix"),
    (3306, "Linux/Unix"),
    (5432, "Linux/Unix"),
    (6379, "Linux/Unix"),
    (8080, "Linux/Unix"),
    (135, "Windows"),
    (139, "Windows"),
    (445, "Windows"),
    (3389, "Windows"),
    (5985, "Windows"),
    (548, "macOS"),
    (23, "Network Device"),
    (161, "Network Device"),
];

/// Outcome of the open-port vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsVote {
    pub os: String,
    pub votes: usize,
}

/// Signature label for a port, if it is OS-indicative.
pub fn service_signature(port: u16) -> Option<&'static str> {
    SERVICE_SIGNATURES
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, os)| *os)
}

/// Let every OS-indicative open port cast one vote.
///
/// The label with the most votes wins. Among equally voted labels the one
/// that received its first vote earliest in `open_ports` wins. Returns
/// `None` when no port matched.
pub fn vote_by_services(open_ports: &[u16]) -> Option<OsVote> {
    let mut tally: Vec<(&'static str, usize)> = Vec::new();

    for os in open_ports.iter().filter_map(|&p| service_signature(p)) {
        match tally.iter_mut().find(|(label, _)| *label == os) {
            Some((_, votes)) => *votes += 1,
            None => tally.push((os, 1)),
        }
    }

    let mut winner: Option<(&'static str, usize)> = None;
    for (os, votes) in tally {
        if winner.map_or(true, |(_, best)| votes > best) {
            winner = Some((os, votes));
        }
    }

    winner.map(|(os, votes)| OsVote {
        os: os.to_string(),
        votes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(kind: ProbeKind, class: ProbeClass, ttl: u8, window: u16) -> ProbeResponse {
        let observed = matches!(class, ProbeClass::Open | ProbeClass::Closed);
        ProbeResponse {
            kind,
            source_port: 80,
            ttl: observed.then_some(ttl),
            window_size: observed.then_some(window),
            flags: observed.then_some(TcpFlags::SYN | TcpFlags::ACK),
            classification: class,
        }
    }

    #[test]
    fn test_windows_ports_vote_together() {
        let vote = vote_by_services(&[3389, 445]).unwrap();
        assert_eq!(vote.os, "Windows");
        assert_eq!(vote.votes, 2);
    }

    #[test]
    fn test_vote_tie_goes_to_first_encountered() {
        let vote = vote_by_services(&[22, 445]).unwrap();
        assert_eq!(vote.os, "Linux/Unix");
        assert_eq!(vote.votes, 1);

        let vote = vote_by_services(&[445, 22]).unwrap();
        assert_eq!(vote.os, "Windows");
    }

    #[test]
    fn test_vote_majority_beats_order() {
        let vote = vote_by_services(&[22, 445, 3389]).unwrap();
        assert_eq!(vote.os, "Windows");
        assert_eq!(vote.votes, 2);
    }

    #[test]
    fn test_vote_without_signatures() {
        assert_eq!(vote_by_services(&[]), None);
        assert_eq!(vote_by_services(&[80, 443, 12345]), None);
    }

    #[test]
    fn test_fingerprint_without_open_evidence() {
        let responses = vec![
            response(ProbeKind::Syn, ProbeClass::Closed, 64, 0),
            response(ProbeKind::Fin, ProbeClass::NoResponse, 0, 0),
        ];
        let result = fingerprint(&responses);
        assert_eq!(result.confidence, Confidence::CannotDetermine);
        assert!(result.os.starts_with("Unknown"));
        assert_eq!(fingerprint(&[]).confidence, Confidence::CannotDetermine);
    }

    #[test]
    fn test_fingerprint_decision_table() {
        let cases = [
            (65535, 64, LINUX_KERNEL_24, Confidence::High),
            (65535, 128, "Windows XP/2000/2003", Confidence::Medium),
            (65535, 255, "Windows Vista/7/8/10/11 or Linux", Confidence::Medium),
            (29200, 64, "Linux/Cisco/Solaris", Confidence::Medium),
            (8192, 128, "Windows Server 2008+ or FreeBSD", Confidence::Medium),
            (4000, 200, "macOS or older Linux", Confidence::Low),
            (1024, 64, "Embedded/IoT device or Firewall", Confidence::Low),
        ];
        for (window, ttl, os, confidence) in cases {
            let result = fingerprint(&[response(ProbeKind::Syn, ProbeClass::Open, ttl, window)]);
            assert_eq!(result.os, os, "window={window} ttl={ttl}");
            assert_eq!(result.confidence, confidence);
            assert_eq!(result.ttl, Some(ttl));
            assert_eq!(result.window_size, Some(window));
        }
    }

    #[test]
    fn test_three_open_probes_upgrade_confidence() {
        let responses = vec![
            response(ProbeKind::Syn, ProbeClass::Open, 64, 64240),
            response(ProbeKind::Syn, ProbeClass::Closed, 64, 0),
            response(ProbeKind::Fin, ProbeClass::OpenFiltered, 0, 0),
            response(ProbeKind::Xmas, ProbeClass::OpenFiltered, 0, 0),
        ];
        let result = fingerprint(&responses);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.os, LINUX_DISTRO);

        let responses = vec![
            response(ProbeKind::Syn, ProbeClass::Open, 128, 8192),
            response(ProbeKind::Fin, ProbeClass::OpenFiltered, 0, 0),
            response(ProbeKind::Null, ProbeClass::OpenFiltered, 0, 0),
        ];
        let result = fingerprint(&responses);
        assert_eq!(result.os, "Windows Server 2008+ or FreeBSD");
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn test_probe_flags() {
        assert_eq!(ProbeKind::Syn.flags(), TcpFlags::SYN);
        assert_eq!(ProbeKind::Null.flags(), 0);
        assert_eq!(
            ProbeKind::Xmas.flags(),
            TcpFlags::FIN | TcpFlags::PSH | TcpFlags::URG
        );
        assert_eq!(Confidence::CannotDetermine.to_string(), "Cannot determine");
    }
}
