//! Bounded-concurrency execution of per-port probes.
//!
//! Every connection-based strategy funnels its probes through
//! [`ExecutionPool`]. A semaphore acts as the admission gate: a probe holds
//! a permit from before it dials until it completes, whatever the outcome.
//! Results are fanned in through the stream, so no task ever touches
//! another task's result.

use crate::types::Port;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::trace;

/// Default number of probes allowed in flight at once.
pub const MAX_CONCURRENCY: usize = 100;

/// Runs one probe per port with a fixed concurrency ceiling.
#[derive(Debug, Clone)]
pub struct ExecutionPool {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
}

impl Default for ExecutionPool {
    fn default() -> Self {
        Self::new(MAX_CONCURRENCY)
    }
}

impl ExecutionPool {
    /// Create a pool admitting at most `max_concurrency` probes (minimum 1).
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    /// Get the concurrency ceiling.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Probe every port and wait for all of them to finish.
    ///
    /// `probe` yields `None` for "no evidence"; those ports are left out.
    /// The returned order follows completion, not `ports`.
    pub async fn run<T, F, Fut>(&self, ports: &[Port], probe: F) -> Vec<T>
    where
        F: Fn(Port) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        trace!(
            ports = ports.len(),
            max_concurrency = self.max_concurrency,
            "dispatching probes"
        );

        stream::iter(ports.iter().copied())
            .map(|port| {
                let sem = Arc::clone(&self.semaphore);
                let probe = probe(port);

                async move {
                    let Ok(_permit) = sem.acquire_owned().await else {
                        return None;
                    };
                    probe.await
                }
            })
            .buffer_unordered(self.max_concurrency)
            .filter_map(|result| async move { result })
            .collect()
            .await
    }
}

/// Convenience wrapper around [`ExecutionPool::run`].
pub async fn run_bounded<T, F, Fut>(ports: &[Port], max_concurrency: usize, probe: F) -> Vec<T>
where
    F: Fn(Port) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    ExecutionPool::new(max_concurrency).run(ports, probe).await
}
