//! Task daemon (spec.md §4.1): a bounded inbound queue plus a dispatcher
//! that launches one detached worker per task. The daemon does not track
//! task completion — a task's own `Runnable` does that.
//!
//! Per SPEC_FULL.md §7, `submit` rejects with `Error::Capacity` the
//! instant the queue is full (`try_send`) rather than blocking the caller:
//! an async HTTP handler blocking on a full mpsc queue would itself starve
//! the runtime's ability to drain that very queue under load, so this is a
//! stricter reading of "natural backpressure" than a blocking `send` would
//! give.

use crate::cancel::CancelToken;
use fe_core::error::Error;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Bounded dispatcher that spawns one detached worker per submitted task.
pub struct TaskDaemon<T> {
    tx: mpsc::Sender<T>,
    cancel: CancelToken,
}

impl<T: Send + 'static> TaskDaemon<T> {
    /// Start a daemon with the given queue `capacity`, dispatching each
    /// received task to `handler` on its own spawned task.
    pub fn spawn<F, Fut>(capacity: usize, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel(capacity);
        let cancel = CancelToken::new();
        let cancel_for_loop = cancel.clone();
        let handler = Arc::new(handler);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel_for_loop.cancelled() => {
                        debug!("task daemon stopping, refusing new work");
                        break;
                    }
                    maybe_task = rx.recv() => {
                        match maybe_task {
                            Some(task) => {
                                let handler = Arc::clone(&handler);
                                tokio::spawn(async move {
                                    handler(task).await;
                                });
                            }
                            None => break,
                        }
                    }
                }
            }
            info!("task daemon exited");
        });

        Self { tx, cancel }
    }

    /// Submit a task. Fails with `Error::Capacity` if the queue is full,
    /// or `Error::Internal` if the daemon has already stopped.
    pub fn submit(&self, task: T) -> Result<(), Error> {
        self.tx.try_send(task).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => {
                Error::Capacity("task daemon queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                Error::Internal("task daemon has stopped".to_string())
            }
        })
    }

    /// Refuse new work and let in-flight dispatch drain. Detached per-task
    /// workers already running are unaffected — the daemon itself does
    /// not track or wait on them (spec.md §4.1).
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn dispatches_submitted_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_for_handler = Arc::clone(&counter);
        let daemon = TaskDaemon::spawn(4, move |_: u32| {
            let counter = Arc::clone(&counter_for_handler);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        for i in 0..3 {
            daemon.submit(i).unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn full_queue_rejects_with_capacity_error() {
        let (gate_tx, gate_rx) = tokio::sync::watch::channel(false);
        let daemon = TaskDaemon::spawn(1, move |_: u32| {
            let mut gate_rx = gate_rx.clone();
            async move {
                let _ = gate_rx.changed().await;
            }
        });

        // First task is picked up immediately and blocks on the gate,
        // second fills the one-slot queue, third should be rejected.
        daemon.submit(1).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        daemon.submit(2).unwrap();
        let err = daemon.submit(3).unwrap_err();
        assert_eq!(err.category(), fe_core::ErrorCategory::Capacity);

        let _ = gate_tx.send(true);
    }
}
