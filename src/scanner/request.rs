//! Validated scan request.

use crate::types::Port;
use std::time::Duration;

/// Everything a strategy needs to run, validated by [`ScanBuilder`].
///
/// Immutable once built: target is non-empty, ports are distinct and
/// non-empty, and the timeout is positive.
///
/// [`ScanBuilder`]: crate::scanner::ScanBuilder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    target: String,
    ports: Vec<Port>,
    timeout: Duration,
    max_concurrency: usize,
    show_closed: bool,
}

impl ScanRequest {
    pub(crate) fn new(
        target: String,
        ports: Vec<Port>,
        timeout: Duration,
        max_concurrency: usize,
        show_closed: bool,
    ) -> Self {
        Self {
            target,
            ports,
            timeout,
            max_concurrency,
            show_closed,
        }
    }

    /// Host name or address as given.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Ports to probe, in request order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Per-operation deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ceiling on in-flight probes for pool-based strategies.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Whether observed non-open states are reported.
    pub fn show_closed(&self) -> bool {
        self.show_closed
    }
}
