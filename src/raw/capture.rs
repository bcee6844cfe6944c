//! Asynchronous reply listener.
//!
//! The listener drains a link-layer receiver on a blocking task and feeds
//! every decoded frame to a [`Correlator`] it owns. It stops when its
//! cancellation token fires (deadline reached, or every probe answered) and
//! hands the correlator back when joined.

use super::correlate::Correlator;
use super::packet::{decode_frame, LinkFraming};
use crate::error::{ScanError, ScanResult};
use pnet::datalink::DataLinkReceiver;
use std::io;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle to a running capture listener.
pub struct Listener {
    handle: JoinHandle<ScanResult<Correlator>>,
    cancel: CancellationToken,
}

impl Listener {
    /// Start draining `receiver`, whose frames carry `framing`. The receiver
    /// must be configured with a read timeout so cancellation is observed
    /// promptly.
    pub fn spawn(
        mut receiver: Box<dyn DataLinkReceiver>,
        framing: LinkFraming,
        mut correlator: Correlator,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::task::spawn_blocking(move || {
            while !token.is_cancelled() {
                match receiver.next() {
                    Ok(frame) => {
                        let Some(reply) = decode_frame(frame, framing) else {
                            continue;
                        };
                        if correlator.record(reply) && correlator.is_complete() {
                            debug!(answered = correlator.answered(), "all probes answered");
                            token.cancel();
                        }
                    }
                    Err(e) if is_idle(&e) => {}
                    Err(e) => {
                        warn!(error = %e, "capture read failed");
                        token.cancel();
                        return Err(ScanError::Capture(e.to_string()));
                    }
                }
            }
            Ok(correlator)
        });

        Self { handle, cancel }
    }

    /// Wait up to `deadline` for replies, then stop the listener and join it.
    ///
    /// Returns early if the listener cancels itself first.
    pub async fn finish(self, deadline: Duration) -> ScanResult<Correlator> {
        tokio::select! {
            _ = tokio::time::sleep(deadline) => {}
            _ = self.cancel.cancelled() => {}
        }
        self.cancel.cancel();

        self.handle
            .await
            .map_err(|e| ScanError::Capture(format!("listener task failed: {e}")))?
    }
}

fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::packet::tests::{reply_frame, TARGET};
    use crate::raw::packet::{CaptureFilter, Probe};
    use pnet::packet::tcp::TcpFlags;
    use std::collections::VecDeque;
    use std::time::Instant;

    /// Replays canned frames, then idles like a receiver with a read timeout.
    struct Replay {
        frames: VecDeque<Vec<u8>>,
        current: Vec<u8>,
        fail_when_empty: bool,
    }

    impl Replay {
        fn new(frames: Vec<Vec<u8>>) -> Self {
            Self {
                frames: frames.into(),
                current: Vec::new(),
                fail_when_empty: false,
            }
        }
    }

    impl DataLinkReceiver for Replay {
        fn next(&mut self) -> io::Result<&[u8]> {
            match self.frames.pop_front() {
                Some(frame) => {
                    self.current = frame;
                    Ok(&self.current)
                }
                None if self.fail_when_empty => {
                    Err(io::Error::new(io::ErrorKind::BrokenPipe, "interface went away"))
                }
                None => {
                    std::thread::sleep(Duration::from_millis(5));
                    Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
                }
            }
        }
    }

    fn probes() -> [Probe; 2] {
        [
            Probe::new(50000, 80, 100, TcpFlags::SYN),
            Probe::new(50000, 81, 100, TcpFlags::SYN),
        ]
    }

    #[tokio::test]
    async fn test_stops_early_when_all_answered() {
        let [a, b] = probes();
        let frames = vec![
            vec![0u8; 3],
            reply_frame(&a, TcpFlags::SYN | TcpFlags::ACK, 101, 64, 65535),
            reply_frame(&b, TcpFlags::RST | TcpFlags::ACK, 101, 64, 0),
        ];
        let correlator = Correlator::new(CaptureFilter::new(TARGET), &[a, b]);

        let started = Instant::now();
        let replay = Box::new(Replay::new(frames));
        let listener = Listener::spawn(replay, LinkFraming::Ethernet, correlator);
        let table = listener.finish(Duration::from_secs(10)).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(table.is_complete());
        assert!(table.reply_for(&a).unwrap().is_syn_ack());
    }

    #[tokio::test]
    async fn test_deadline_stops_listener() {
        let [a, b] = probes();
        let frames = vec![reply_frame(&a, TcpFlags::SYN | TcpFlags::ACK, 101, 64, 65535)];
        let correlator = Correlator::new(CaptureFilter::new(TARGET), &[a, b]);

        let replay = Box::new(Replay::new(frames));
        let listener = Listener::spawn(replay, LinkFraming::Ethernet, correlator);
        let table = listener.finish(Duration::from_millis(100)).await.unwrap();

        assert_eq!(table.answered(), 1);
        assert!(table.reply_for(&b).is_none());
    }

    #[tokio::test]
    async fn test_read_failure_is_fatal() {
        let [a, b] = probes();
        let mut replay = Replay::new(Vec::new());
        replay.fail_when_empty = true;
        let correlator = Correlator::new(CaptureFilter::new(TARGET), &[a, b]);

        let listener = Listener::spawn(Box::new(replay), LinkFraming::Ethernet, correlator);
        let err = listener.finish(Duration::from_secs(10)).await.unwrap_err();
        assert!(matches!(err, ScanError::Capture(_)));
    }
}
