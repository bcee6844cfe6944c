//! Port numbers and user-typed port sets.
//!
//! Port 0 is never a valid probe target, so [`Port`] only holds 1-65535.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A probe-able TCP/UDP port (never 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// `None` for port 0.
    pub const fn new(number: u16) -> Option<Self> {
        match number {
            0 => None,
            n => Some(Self(n)),
        }
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(number: u16) -> Result<Self, Self::Error> {
        Self::new(number).ok_or(PortError::OutOfRange(number))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.as_u16()
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a port or port set was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is outside 1-65535")]
    OutOfRange(u16),
    #[error("'{0}' is not a port number")]
    InvalidFormat(String),
    #[error("port range {0}-{1} is inverted")]
    InvalidRange(u16, u16),
    #[error("no ports given")]
    Empty,
}

/// Inclusive run of ports, `first <= last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    first: Port,
    last: Port,
}

impl PortRange {
    /// Validate raw bounds: both must be ports and `start <= end`.
    pub fn from_bounds(start: u16, end: u16) -> Result<Self, PortError> {
        let first = Port::try_from(start)?;
        let last = Port::try_from(end)?;
        if first > last {
            return Err(PortError::InvalidRange(start, end));
        }
        Ok(Self { first, last })
    }

    pub fn len(&self) -> usize {
        usize::from(self.last.0 - self.first.0) + 1
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.first.0..=self.last.0).map(Port)
    }
}

/// Ordered, duplicate-free port set parsed from text such as
/// `"22,80,8000-8100"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    ports: Vec<Port>,
}

impl PortSpec {
    /// Ports in the order first written.
    pub fn to_ports(&self) -> Vec<Port> {
        self.ports.clone()
    }

    pub fn count(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

impl FromIterator<Port> for PortSpec {
    fn from_iter<I: IntoIterator<Item = Port>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        Self {
            ports: iter.into_iter().filter(|p| seen.insert(*p)).collect(),
        }
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.trim().is_empty() {
            return Err(PortError::Empty);
        }

        let mut ports = Vec::new();
        for term in text.split(',').map(str::trim) {
            match term.split_once('-') {
                Some((lo, hi)) => {
                    let range = PortRange::from_bounds(number(lo)?, number(hi)?)?;
                    ports.extend(range.iter());
                }
                None => ports.push(Port::try_from(number(term)?)?),
            }
        }
        Ok(ports.into_iter().collect())
    }
}

fn number(text: &str) -> Result<u16, PortError> {
    let text = text.trim();
    text.parse()
        .map_err(|_| PortError::InvalidFormat(text.to_string()))
}

/// Ports probed when the caller gives no explicit set.
pub const COMMON_PORTS: &[u16] = &[
    21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 443, 445, 993, 995, 1723, 3306, 3389, 5432,
    5900, 6379, 8080, 8443,
];

/// The default common-port set as validated ports.
pub fn common_ports() -> Vec<Port> {
    COMMON_PORTS.iter().copied().filter_map(Port::new).collect()
}
