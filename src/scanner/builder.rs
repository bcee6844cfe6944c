//! Fluent scan request builder.
//!
//! Every setter validates its input immediately but never fails: problems
//! are recorded and reported together when the request is built. Nothing
//! touches the network before [`ScanBuilder::run`].

use crate::config::EngineSettings;
use crate::error::{RequestError, ScanError, ScanResult};
use crate::scanner::os_detect::{OsDetector, OsReport};
use crate::scanner::pool::MAX_CONCURRENCY;
use crate::scanner::request::ScanRequest;
use crate::scanner::syn::SynScanner;
use crate::scanner::tcp::TcpConnectScanner;
use crate::scanner::traits::{PortResult, ScanType, Scanner};
use crate::scanner::udp::UdpScanner;
use crate::types::{common_ports, Port, PortError, PortRange, PortSpec};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Strategy the builder dispatches to.
#[derive(Clone)]
enum Strategy {
    Builtin(ScanType),
    Custom(Arc<dyn Scanner>),
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(scan_type) => write!(f, "Builtin({scan_type:?})"),
            Self::Custom(scanner) => write!(f, "Custom({:?})", scanner.scan_type()),
        }
    }
}

/// What a finished scan produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "report", rename_all = "lowercase")]
pub enum ScanOutcome {
    /// Per-port results, sorted by port.
    Ports(Vec<PortResult>),
    /// OS detection report.
    Os(OsReport),
}

impl ScanOutcome {
    /// No open port was found.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Ports(results) => !results.iter().any(PortResult::is_open),
            Self::Os(report) => {
                report.open_ports.is_empty()
                    && !report
                        .responses
                        .iter()
                        .any(|r| r.classification.shows_open())
            }
        }
    }
}

/// Builder field a settings value was rejected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Ports,
    Timeout,
}

/// Accumulates a scan configuration and dispatches it.
///
/// ```rust,ignore
/// let outcome = ScanBuilder::new()
///     .target("192.168.1.1")
///     .port_range(20, 25)
///     .timeout(Duration::from_millis(500))
///     .run()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct ScanBuilder {
    target: Option<String>,
    ports: Vec<Port>,
    timeout: Duration,
    strategy: Strategy,
    max_concurrency: usize,
    show_closed: bool,
    errors: Vec<RequestError>,
    /// Rejected settings values, dropped once the caller sets the field.
    rejected_settings: Vec<(Field, RequestError)>,
}

impl Default for ScanBuilder {
    fn default() -> Self {
        Self {
            target: None,
            ports: common_ports(),
            timeout: DEFAULT_TIMEOUT,
            strategy: Strategy::Builtin(ScanType::Connect),
            max_concurrency: MAX_CONCURRENCY,
            show_closed: false,
            errors: Vec::new(),
            rejected_settings: Vec::new(),
        }
    }
}

impl ScanBuilder {
    /// Common ports, two second timeout, connect scan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from loaded settings.
    ///
    /// Later calls override them. A settings value that fails validation
    /// is only reported if the caller never sets that field explicitly.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        let mut builder = Self::new()
            .scan_type(settings.default_scan_type)
            .max_concurrency(settings.max_concurrency);

        let timeout = Duration::from_millis(settings.default_timeout_ms);
        if timeout.is_zero() {
            builder
                .rejected_settings
                .push((Field::Timeout, RequestError::InvalidTimeout));
        } else {
            builder.timeout = timeout;
        }

        if let Some(text) = &settings.default_ports {
            match text.parse::<PortSpec>() {
                Ok(spec) if !spec.is_empty() => builder.ports = spec.to_ports(),
                Ok(_) => builder
                    .rejected_settings
                    .push((Field::Ports, PortError::Empty.into())),
                Err(e) => builder.rejected_settings.push((Field::Ports, e.into())),
            }
        }
        builder
    }

    fn overridden(&mut self, field: Field) {
        self.rejected_settings.retain(|(f, _)| *f != field);
    }

    /// Host name or IP address to probe. Must not be empty.
    pub fn target(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        if host.trim().is_empty() {
            self.errors.push(RequestError::EmptyTarget);
        } else {
            self.target = Some(host);
        }
        self
    }

    /// Replace the port set with an explicit list.
    ///
    /// Duplicates are dropped, first occurrence wins.
    pub fn ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        let raw: Vec<u16> = ports.into_iter().collect();
        if raw.is_empty() {
            self.errors.push(PortError::Empty.into());
            return self;
        }

        let mut valid = Vec::with_capacity(raw.len());
        let mut invalid = false;
        for number in raw {
            match Port::try_from(number) {
                Ok(port) => valid.push(port),
                Err(e) => {
                    self.errors.push(e.into());
                    invalid = true;
                }
            }
        }

        if !invalid {
            self.ports = distinct(valid);
            self.overridden(Field::Ports);
        }
        self
    }

    /// Replace the port set with every port in `start..=end`.
    pub fn port_range(mut self, start: u16, end: u16) -> Self {
        match PortRange::from_bounds(start, end) {
            Ok(range) => {
                self.ports = range.iter().collect();
                self.overridden(Field::Ports);
            }
            Err(e) => self.errors.push(e.into()),
        }
        self
    }

    /// Replace the port set with a parsed specification.
    pub fn port_spec(mut self, spec: &PortSpec) -> Self {
        let ports = spec.to_ports();
        if ports.is_empty() {
            self.errors.push(PortError::Empty.into());
        } else {
            self.ports = ports;
            self.overridden(Field::Ports);
        }
        self
    }

    /// Per-operation deadline. Must be positive.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if timeout.is_zero() {
            self.errors.push(RequestError::InvalidTimeout);
        } else {
            self.timeout = timeout;
            self.overridden(Field::Timeout);
        }
        self
    }

    pub fn connect(self) -> Self {
        self.scan_type(ScanType::Connect)
    }

    pub fn udp(self) -> Self {
        self.scan_type(ScanType::Udp)
    }

    pub fn syn(self) -> Self {
        self.scan_type(ScanType::Syn)
    }

    pub fn os(self) -> Self {
        self.scan_type(ScanType::Os)
    }

    /// Select one of the built-in strategies.
    pub fn scan_type(mut self, scan_type: ScanType) -> Self {
        self.strategy = Strategy::Builtin(scan_type);
        self
    }

    /// Dispatch to a caller-supplied strategy instead of a built-in one.
    pub fn with_scanner(mut self, scanner: Arc<dyn Scanner>) -> Self {
        self.strategy = Strategy::Custom(scanner);
        self
    }

    /// Also report observed non-open states.
    pub fn show_closed(mut self, show: bool) -> Self {
        self.show_closed = show;
        self
    }

    /// Ceiling on in-flight probes for pool-based strategies.
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    /// The strategy that [`run`](Self::run) will use.
    pub fn selected_scan_type(&self) -> ScanType {
        match &self.strategy {
            Strategy::Builtin(scan_type) => *scan_type,
            Strategy::Custom(scanner) => scanner.scan_type(),
        }
    }

    /// Validate and freeze the request.
    ///
    /// # Errors
    /// [`ScanError::InvalidRequest`] carrying every recorded problem, or
    /// [`RequestError::EmptyTarget`] alone if no target was ever given.
    pub fn build(&self) -> ScanResult<ScanRequest> {
        let errors: Vec<RequestError> = self
            .rejected_settings
            .iter()
            .map(|(_, e)| e.clone())
            .chain(self.errors.iter().cloned())
            .collect();
        if !errors.is_empty() {
            return Err(ScanError::InvalidRequest(errors));
        }
        let Some(target) = &self.target else {
            return Err(ScanError::InvalidRequest(vec![RequestError::EmptyTarget]));
        };

        Ok(ScanRequest::new(
            target.clone(),
            self.ports.clone(),
            self.timeout,
            self.max_concurrency,
            self.show_closed,
        ))
    }

    /// Build the request and run the selected strategy.
    pub async fn run(self) -> ScanResult<ScanOutcome> {
        let request = self.build()?;
        debug!(
            target = request.target(),
            ports = request.ports().len(),
            strategy = ?self.strategy,
            "dispatching scan"
        );

        let mut results = match &self.strategy {
            Strategy::Builtin(ScanType::Os) => {
                let report = OsDetector::new().detect(&request).await?;
                return Ok(ScanOutcome::Os(report));
            }
            Strategy::Builtin(ScanType::Connect) => TcpConnectScanner::new().scan(&request).await?,
            Strategy::Builtin(ScanType::Udp) => UdpScanner::new().scan(&request).await?,
            Strategy::Builtin(ScanType::Syn) => SynScanner::new().scan(&request).await?,
            Strategy::Custom(scanner) => scanner.scan(&request).await?,
        };

        results.sort_by_key(|r| r.port);
        Ok(ScanOutcome::Ports(results))
    }
}

fn distinct(ports: Vec<Port>) -> Vec<Port> {
    let mut seen = HashSet::with_capacity(ports.len());
    ports.into_iter().filter(|p| seen.insert(*p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::PortStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recording {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Scanner for Recording {
        fn scan_type(&self) -> ScanType {
            ScanType::Connect
        }

        async fn scan(&self, request: &ScanRequest) -> ScanResult<Vec<PortResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(request
                .ports()
                .iter()
                .rev()
                .map(|&p| PortResult::new(p, PortStatus::Open))
                .collect())
        }
    }

    fn numbers(request: &ScanRequest) -> Vec<u16> {
        request.ports().iter().map(|p| p.as_u16()).collect()
    }

    #[test]
    fn test_defaults() {
        let request = ScanBuilder::new().target("localhost").build().unwrap();
        assert_eq!(request.ports(), common_ports().as_slice());
        assert_eq!(request.timeout(), Duration::from_secs(2));
        assert_eq!(request.max_concurrency(), MAX_CONCURRENCY);
        assert!(!request.show_closed());
    }

    #[test]
    fn test_port_range_expands() {
        let request = ScanBuilder::new()
            .target("localhost")
            .port_range(5000, 5002)
            .build()
            .unwrap();
        assert_eq!(numbers(&request), vec![5000, 5001, 5002]);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let err = ScanBuilder::new()
            .target("localhost")
            .port_range(10, 5)
            .build()
            .unwrap_err();
        match err {
            ScanError::InvalidRequest(errors) => {
                assert_eq!(errors, vec![RequestError::Port(PortError::InvalidRange(10, 5))]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_range_start_is_rejected() {
        assert!(ScanBuilder::new()
            .target("localhost")
            .port_range(0, 10)
            .build()
            .is_err());
    }

    #[test]
    fn test_ports_dedup_and_replace() {
        let request = ScanBuilder::new()
            .target("localhost")
            .ports([443, 80, 443])
            .build()
            .unwrap();
        assert_eq!(numbers(&request), vec![443, 80]);
    }

    #[test]
    fn test_errors_accumulate() {
        let err = ScanBuilder::new()
            .target("")
            .ports(Vec::<u16>::new())
            .ports([0])
            .timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        match err {
            ScanError::InvalidRequest(errors) => {
                assert_eq!(
                    errors,
                    vec![
                        RequestError::EmptyTarget,
                        RequestError::Port(PortError::Empty),
                        RequestError::Port(PortError::OutOfRange(0)),
                        RequestError::InvalidTimeout,
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_target() {
        let err = ScanBuilder::new().build().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("target cannot be empty"));
    }

    #[test]
    fn test_selectors() {
        assert_eq!(ScanBuilder::new().selected_scan_type(), ScanType::Connect);
        assert_eq!(ScanBuilder::new().udp().selected_scan_type(), ScanType::Udp);
        assert_eq!(ScanBuilder::new().syn().selected_scan_type(), ScanType::Syn);
        assert_eq!(ScanBuilder::new().os().connect().selected_scan_type(), ScanType::Connect);
        assert_eq!(ScanBuilder::new().os().selected_scan_type(), ScanType::Os);
    }

    #[test]
    fn test_from_settings() {
        let settings = EngineSettings {
            default_timeout_ms: 750,
            default_scan_type: ScanType::Udp,
            max_concurrency: 8,
            default_ports: Some("53,161-162".to_string()),
        };
        let builder = ScanBuilder::from_settings(&settings).target("10.0.0.1");
        assert_eq!(builder.selected_scan_type(), ScanType::Udp);

        let request = builder.build().unwrap();
        assert_eq!(request.timeout(), Duration::from_millis(750));
        assert_eq!(request.max_concurrency(), 8);
        assert_eq!(numbers(&request), vec![53, 161, 162]);
    }

    #[test]
    fn test_bad_settings_are_reported_when_not_overridden() {
        let settings = EngineSettings {
            default_timeout_ms: 0,
            default_ports: Some("http".to_string()),
            ..EngineSettings::default()
        };
        let err = ScanBuilder::from_settings(&settings)
            .target("10.0.0.1")
            .build()
            .unwrap_err();
        match err {
            ScanError::InvalidRequest(errors) => assert_eq!(
                errors,
                vec![
                    RequestError::InvalidTimeout,
                    RequestError::Port(PortError::InvalidFormat("http".to_string())),
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_values_override_bad_settings() {
        let settings = EngineSettings {
            default_timeout_ms: 0,
            default_ports: Some("http".to_string()),
            ..EngineSettings::default()
        };

        let request = ScanBuilder::from_settings(&settings)
            .target("10.0.0.1")
            .ports([80])
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        assert_eq!(numbers(&request), vec![80]);
        assert_eq!(request.timeout(), Duration::from_millis(500));

        let spec: PortSpec = "22-23".parse().unwrap();
        let request = ScanBuilder::from_settings(&settings)
            .target("10.0.0.1")
            .port_spec(&spec)
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(numbers(&request), vec![22, 23]);

        // ports replaced, zero timeout still stands
        assert!(ScanBuilder::from_settings(&settings)
            .target("10.0.0.1")
            .port_range(1, 10)
            .build()
            .is_err());
    }

    #[test]
    fn test_invalid_override_still_fails() {
        let settings = EngineSettings {
            default_ports: Some("http".to_string()),
            ..EngineSettings::default()
        };
        let err = ScanBuilder::from_settings(&settings)
            .target("10.0.0.1")
            .ports([0])
            .build()
            .unwrap_err();
        match err {
            ScanError::InvalidRequest(errors) => assert_eq!(
                errors,
                vec![
                    RequestError::Port(PortError::InvalidFormat("http".to_string())),
                    RequestError::Port(PortError::OutOfRange(0)),
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_request_never_dispatches() {
        let mock = Arc::new(Recording::default());

        let empty_ports = ScanBuilder::new()
            .target("localhost")
            .ports(Vec::<u16>::new())
            .with_scanner(mock.clone())
            .run()
            .await;
        assert!(empty_ports.is_err());

        let empty_target = ScanBuilder::new()
            .target("")
            .with_scanner(mock.clone())
            .run()
            .await;
        assert!(empty_target.is_err());

        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_results_are_sorted() {
        let mock = Arc::new(Recording::default());
        let outcome = ScanBuilder::new()
            .target("localhost")
            .ports([8080, 22, 443])
            .with_scanner(mock.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
        assert!(!outcome.is_empty());
        match outcome {
            ScanOutcome::Ports(results) => {
                let ports: Vec<u16> = results.iter().map(|r| r.port.as_u16()).collect();
                assert_eq!(ports, vec![22, 443, 8080]);
            }
            ScanOutcome::Os(_) => panic!("expected port results"),
        }
    }

    #[test]
    fn test_closed_only_outcome_is_empty() {
        let port = Port::new(80).unwrap();
        assert!(ScanOutcome::Ports(vec![]).is_empty());
        assert!(ScanOutcome::Ports(vec![PortResult::new(port, PortStatus::Closed)]).is_empty());
        assert!(!ScanOutcome::Ports(vec![PortResult::new(port, PortStatus::Open)]).is_empty());
    }
}
