//! Bounded-concurrency task scheduler.
//!
//! The dispatch loop takes a permit from a shared [`Semaphore`] before it
//! spawns each task, so no more than `limit` tasks are ever in flight. Each
//! task holds its permit until it finishes; the permit is returned on drop,
//! including when the task fails or panics. Task failures go to an error
//! channel drained by a separate collector task, which is closed only after
//! every spawned task has been joined.

use std::future::Future;
use std::sync::Arc;

use avmerge_common::{Error, TaskError};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Half the logical cores, at least one.
pub fn default_concurrency() -> usize {
    (num_cpus::get() / 2).max(1)
}

/// Outcome of [`Scheduler::run`].
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Tasks that were spawned.
    pub dispatched: usize,
    /// Tasks that returned `Ok`.
    pub succeeded: usize,
    /// Items left undispatched because the run was cancelled.
    pub skipped: usize,
    /// Every reported failure, in arrival order.
    pub errors: Vec<TaskError>,
    /// Tasks that panicked instead of returning.
    pub panicked: usize,
}

impl RunSummary {
    /// Number of dispatched tasks that did not succeed.
    pub fn failed(&self) -> usize {
        self.errors.len() + self.panicked
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped == 0
    }

    /// Whether the run was cut short by cancellation: items were left
    /// undispatched or a running task was stopped.
    pub fn was_cancelled(&self) -> bool {
        self.skipped > 0
            || self
                .errors
                .iter()
                .any(|e| matches!(e.source, Error::Cancelled))
    }
}

/// Runs one future per item with at most `limit` running at once.
#[derive(Debug, Clone)]
pub struct Scheduler {
    limit: usize,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler. A `limit` of zero is raised to one.
    pub fn new(limit: usize, cancel: CancellationToken) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            permits: Arc::new(Semaphore::new(limit)),
            cancel,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held by a running task.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `task` once for every item and wait for all of them.
    ///
    /// `task` receives the item and a clone of the scheduler's cancellation
    /// token, to be passed down to any subprocess it starts. Items are
    /// dispatched in iteration order. If the token is cancelled while the
    /// dispatch loop waits for a free slot, the remaining items are skipped;
    /// tasks already running are still joined.
    pub async fn run<I, T, F, Fut>(&self, items: I, task: F) -> RunSummary
    where
        I: IntoIterator<Item = T>,
        T: Send + 'static,
        F: Fn(T, CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let (err_tx, mut err_rx) = mpsc::channel::<TaskError>(self.limit);

        let collector = tokio::spawn(async move {
            let mut errors = Vec::new();
            while let Some(err) = err_rx.recv().await {
                tracing::error!("{err}");
                errors.push(err);
            }
            errors
        });

        let mut summary = RunSummary::default();
        let mut tasks = JoinSet::new();
        let mut items = items.into_iter();

        for item in items.by_ref() {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    summary.skipped += 1;
                    break;
                }
                permit = self.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::error!("scheduler semaphore closed");
                        summary.skipped += 1;
                        break;
                    }
                },
            };

            let fut = task(item, self.cancel.clone());
            let err_tx = err_tx.clone();
            summary.dispatched += 1;
            tasks.spawn(async move {
                let _permit = permit;
                match fut.await {
                    Ok(()) => true,
                    Err(e) => {
                        // The collector outlives every task, so this only
                        // fails if it panicked.
                        if let Err(mpsc::error::SendError(e)) = err_tx.send(e).await {
                            tracing::error!("{e}");
                        }
                        false
                    }
                }
            });
        }
        summary.skipped += items.count();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("merge task aborted: {e}");
                    summary.panicked += 1;
                }
            }
        }

        // All senders held by tasks are gone; dropping ours closes the
        // channel and lets the collector finish.
        drop(err_tx);
        summary.errors = match collector.await {
            Ok(errors) => errors,
            Err(e) => {
                tracing::error!("error collector aborted: {e}");
                Vec::new()
            }
        };

        if summary.skipped > 0 {
            tracing::warn!("Cancelled; {} tasks were not started", summary.skipped);
        }

        summary
    }
}
