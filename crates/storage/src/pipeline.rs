//! Bounded work queue with a first-error-wins join
//!
//! `WorkQueue::run` is the one concurrency primitive behind every batch and
//! fan-out operation:
//!
//! ```text
//! producer ──▶ bounded queue (capacity P) ──▶ P workers ──▶ outputs
//! ```
//!
//! - The producer feeds inputs into the queue; workers pull them and run the
//!   operation once per input.
//! - Every queue operation and every operation call races a child of the
//!   caller's cancellation token.
//! - The first worker error cancels the child token; the others unwind with
//!   `Canceled`.
//! - The call returns only after every spawned task has finished. It reports
//!   the first error that is not `Canceled`, or `Canceled` if the caller
//!   cancelled. Outputs are discarded once any error occurs.
//!
//! Output order is unspecified.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};

use kifudb_core::{Error, Result};

/// Degree of parallelism used when none is configured
pub const DEFAULT_PARALLELISM: usize = 2;

/// A pool of `parallelism` workers fed through a bounded queue
#[derive(Debug, Clone, Copy)]
pub struct WorkQueue {
    parallelism: usize,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLELISM)
    }
}

impl WorkQueue {
    /// Create a queue with the given worker count (at least one)
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    /// Worker count
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Run `op` once per input on the worker pool
    ///
    /// `op` receives the operation's own cancellation token so nested work
    /// can stop when a sibling fails.
    pub async fn run<I, O, F, Fut>(
        &self,
        inputs: Vec<I>,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<Vec<O>>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(I, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let total = inputs.len();
        let workers = self.parallelism.min(total);
        debug!(inputs = total, workers, "work queue start");

        let token = cancel.child_token();
        let (tx, rx) = mpsc::channel::<I>(self.parallelism);
        let rx = Arc::new(Mutex::new(rx));
        let op = Arc::new(op);

        let mut tasks: JoinSet<Result<Vec<O>>> = JoinSet::new();

        let producer_token = token.clone();
        tasks.spawn(
            async move {
                for input in inputs {
                    tokio::select! {
                        biased;
                        _ = producer_token.cancelled() => return Err(Error::Canceled),
                        sent = tx.send(input) => {
                            if sent.is_err() {
                                // Every worker has exited; they report why.
                                break;
                            }
                        }
                    }
                }
                Ok(Vec::new())
            }
            .in_current_span(),
        );

        for _ in 0..workers {
            let rx = Arc::clone(&rx);
            let token = token.clone();
            let op = Arc::clone(&op);
            tasks.spawn(
                async move {
                    let mut out = Vec::new();
                    loop {
                        let next = tokio::select! {
                            biased;
                            _ = token.cancelled() => return Err(Error::Canceled),
                            next = async { rx.lock().await.recv().await } => next,
                        };
                        let Some(input) = next else {
                            return Ok(out);
                        };

                        let result = tokio::select! {
                            biased;
                            _ = token.cancelled() => Err(Error::Canceled),
                            r = (*op)(input, token.clone()) => r,
                        };
                        match result {
                            Ok(o) => out.push(o),
                            Err(e) => {
                                token.cancel();
                                return Err(e);
                            }
                        }
                    }
                }
                .in_current_span(),
            );
        }

        join_first_error(tasks, &token).await.map(|outputs| {
            debug!(outputs = outputs.len(), "work queue done");
            outputs
        })
    }
}

/// Wait for every task; keep the first error that is not `Canceled`
async fn join_first_error<O: Send + 'static>(
    mut tasks: JoinSet<Result<Vec<O>>>,
    token: &CancellationToken,
) -> Result<Vec<O>> {
    let mut outputs = Vec::new();
    let mut first_error: Option<Error> = None;

    while let Some(joined) = tasks.join_next().await {
        let result = joined
            .unwrap_or_else(|e| Err(Error::internal(format!("worker task failed: {}", e))));
        match result {
            Ok(mut out) => outputs.append(&mut out),
            Err(e) => {
                token.cancel();
                first_error = match first_error {
                    None => Some(e),
                    Some(prev) if prev.is_canceled() && !e.is_canceled() => Some(e),
                    Some(prev) => Some(prev),
                };
            }
        }
    }

    match first_error {
        Some(e) => {
            if !e.is_canceled() {
                warn!(error = %e, "work queue failed");
            }
            Err(e)
        }
        None => Ok(outputs),
    }
}
