//! OS detection path.
//!
//! Combines two signals: a connect scan of the requested ports feeds the
//! service vote, and the raw probe battery feeds the window/TTL
//! fingerprint. The raw half needs the same privileges as a SYN scan.

use crate::error::ScanResult;
use crate::os::{
    fingerprint, vote_by_services, OsResult, OsVote, ProbeClass, ProbeKind, ProbeResponse,
    PROBE_BATTERY,
};
use crate::raw::{self, Probe, RawSession, Reply};
use crate::scanner::tcp::TcpConnectScanner;
use crate::scanner::traits::{PortResult, Scanner};
use crate::scanner::ScanRequest;
use crate::types::ScanTarget;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Everything the OS path learned about one target.
#[derive(Debug, Clone, Serialize)]
pub struct OsReport {
    pub target: String,
    pub fingerprint: OsResult,
    pub responses: Vec<ProbeResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<OsVote>,
    pub open_ports: Vec<PortResult>,
}

/// Runs the service vote and the fingerprint battery against one target.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsDetector;

impl OsDetector {
    pub fn new() -> Self {
        Self
    }

    pub async fn detect(&self, request: &ScanRequest) -> ScanResult<OsReport> {
        if !raw::is_privileged() {
            debug!("not running as root, raw socket access will likely fail");
        }

        let mut open_ports = TcpConnectScanner::new().scan(request).await?;
        open_ports.sort_by_key(|r| r.port);
        let numbers: Vec<u16> = open_ports.iter().map(|r| r.port.as_u16()).collect();
        let vote = vote_by_services(&numbers);
        debug!(open = open_ports.len(), ?vote, "service vote done");

        let (target, ip) = ScanTarget::resolve_v4(request.target()).await?;
        let session = RawSession::open(ip).await?;

        let battery = battery_probes(raw::ephemeral_port(PROBE_BATTERY.len() as u16));
        let probes: Vec<Probe> = battery.iter().map(|(_, probe)| *probe).collect();
        let replies = session.exchange(&probes, request.timeout()).await?;

        let responses = classify_battery(&battery, |probe| replies.reply_for(probe).copied());
        let fingerprint = fingerprint(&responses);
        info!(%target, os = %fingerprint.os, confidence = %fingerprint.confidence, "fingerprint");

        Ok(OsReport {
            target: target.to_string(),
            fingerprint,
            responses,
            vote,
            open_ports,
        })
    }
}

/// The fixed battery, one source port per probe starting at `base`.
pub fn battery_probes(base: u16) -> Vec<(ProbeKind, Probe)> {
    PROBE_BATTERY
        .iter()
        .zip(base..)
        .map(|(&(kind, port), source_port)| {
            let probe = Probe::new(source_port, port, raw::initial_sequence(), kind.flags());
            (kind, probe)
        })
        .collect()
}

/// Classify each battery probe by the reply (if any) it drew.
///
/// Stealth probes are judged after the SYN probes so they can lean on a SYN
/// probe's view of the same port.
pub fn classify_battery<F>(battery: &[(ProbeKind, Probe)], reply_for: F) -> Vec<ProbeResponse>
where
    F: Fn(&Probe) -> Option<Reply>,
{
    let replies: Vec<Option<Reply>> = battery.iter().map(|(_, probe)| reply_for(probe)).collect();

    let syn_open: HashSet<u16> = battery
        .iter()
        .zip(&replies)
        .filter(|((kind, _), reply)| {
            *kind == ProbeKind::Syn && reply.is_some_and(|r| r.is_syn_ack())
        })
        .map(|((_, probe), _)| probe.target_port)
        .collect();

    battery
        .iter()
        .zip(replies)
        .map(|(&(kind, probe), reply)| {
            let classification = match (kind, &reply) {
                (_, Some(r)) if r.is_rst() => ProbeClass::Closed,
                (ProbeKind::Syn, Some(r)) if r.is_syn_ack() => ProbeClass::Open,
                (ProbeKind::Syn, _) => ProbeClass::NoResponse,
                (_, None) if syn_open.contains(&probe.target_port) => ProbeClass::OpenFiltered,
                _ => ProbeClass::NoResponse,
            };
            ProbeResponse {
                kind,
                source_port: probe.target_port,
                ttl: reply.map(|r| r.ttl),
                window_size: reply.map(|r| r.window),
                flags: reply.map(|r| r.flags),
                classification,
            }
        })
        .collect()
}
