//! Scanner module - coordinates different scanning techniques.
//!
//! [`ScanBuilder`] validates a configuration into a [`ScanRequest`] and
//! dispatches it to one strategy:
//!
//! - [`TcpConnectScanner`] and [`UdpScanner`] run one probe per port through
//!   the bounded [`ExecutionPool`].
//! - [`SynScanner`] and [`OsDetector`] go through the raw probe/capture
//!   pipeline in [`crate::raw`].

pub mod builder;
pub mod os_detect;
pub mod pool;
pub mod request;
pub mod syn;
pub mod tcp;
pub mod traits;
pub mod udp;

pub use builder::{ScanBuilder, ScanOutcome, DEFAULT_TIMEOUT};
pub use os_detect::{battery_probes, classify_battery, OsDetector, OsReport};
pub use pool::{run_bounded, ExecutionPool, MAX_CONCURRENCY};
pub use request::ScanRequest;
pub use syn::SynScanner;
pub use tcp::TcpConnectScanner;
pub use traits::{PortResult, PortStatus, ScanType, Scanner};
pub use udp::UdpScanner;
