//! Matching captured replies to the probes that caused them.

use super::packet::{CaptureFilter, Probe, Reply};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Table of outstanding probes and the first valid reply seen for each.
///
/// A reply is accepted only if it passes the capture filter, its port pair
/// matches a probe, it is a SYN/ACK or RST, and (when it carries an ACK)
/// the acknowledgement number is the one the probe implies.
#[derive(Debug, Clone)]
pub struct Correlator {
    filter: CaptureFilter,
    probes: HashMap<(u16, u16), Probe>,
    replies: HashMap<(u16, u16), Reply>,
}

impl Correlator {
    pub fn new(filter: CaptureFilter, probes: &[Probe]) -> Self {
        Self {
            filter,
            probes: probes.iter().map(|p| (p.reply_key(), *p)).collect(),
            replies: HashMap::with_capacity(probes.len()),
        }
    }

    /// Record a reply. Returns true if it answered a probe for the first time.
    pub fn record(&mut self, reply: Reply) -> bool {
        if !self.filter.matches(&reply) || !(reply.is_syn_ack() || reply.is_rst()) {
            return false;
        }

        let key = reply.key();
        let Some(probe) = self.probes.get(&key) else {
            return false;
        };
        if reply.has_ack() && reply.acknowledgement != probe.expected_ack() {
            return false;
        }

        match self.replies.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(reply);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Every probe has been answered.
    pub fn is_complete(&self) -> bool {
        self.replies.len() == self.probes.len()
    }

    pub fn reply_for(&self, probe: &Probe) -> Option<&Reply> {
        self.replies.get(&probe.reply_key())
    }

    pub fn answered(&self) -> usize {
        self.replies.len()
    }
}
