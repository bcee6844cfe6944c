//! Raw probe/capture pipeline.
//!
//! Used by the SYN stealth scanner and the OS fingerprint battery. A session
//! discovers the egress interface, opens one capture handle on it with a
//! single "TCP from target" filter, transmits crafted probes and correlates
//! replies by full tuple until the deadline or until every probe is
//! answered.
//!
//! # Privileges Required
//!
//! Opening the capture handle and the raw send socket requires
//! root/administrator privileges.

mod capture;
mod correlate;
mod interface;
mod packet;
mod session;

pub use capture::Listener;
pub use correlate::Correlator;
pub use interface::{discover_egress, find_interface_for, Egress};
pub use packet::{
    build_probe, decode_frame, decode_ipv4, ephemeral_port, initial_sequence, CaptureFilter,
    LinkFraming, Probe, Reply, PROBE_TTL, PROBE_WINDOW,
};
pub use session::RawSession;

/// Check if running with root privileges.
pub fn is_privileged() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
