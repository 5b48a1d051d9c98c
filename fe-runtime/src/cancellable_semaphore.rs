//! Cancellable submission semaphore (spec.md §9 design note).
//!
//! The source bounds submission parallelism with a token semaphore of size
//! `maxParallelSubmissionsPerSensor` plus a *separate* same-sized cancel
//! semaphore and a `submissionCancelled` atomic bool
//! (`original_source/sensor/task-worker.go`). This combines both into one
//! semaphore: acquiring after cancellation returns no ticket at all, and a
//! ticket held across a cancellation is *forgotten* on drop rather than
//! released, permanently shrinking capacity by one — exactly "a cancelled
//! acquire never returns a usable token" and "in-flight submissions drain
//! but new ones do not start" (spec.md §4.3, §5).

use crate::cancel::CancelToken;
use std::sync::Arc;
use tokio::sync::{Semaphore, OwnedSemaphorePermit};

/// A semaphore whose permits stop being handed out, and stop being
/// returned, once cancelled.
pub struct CancellableSemaphore {
    sem: Arc<Semaphore>,
    cancel: CancelToken,
}

impl CancellableSemaphore {
    /// Create a semaphore with `capacity` tokens.
    pub fn new(capacity: usize) -> Self {
        Self { sem: Arc::new(Semaphore::new(capacity)), cancel: CancelToken::new() }
    }

    /// Request cancellation. Any acquire already waiting returns `None`
    /// immediately; any ticket currently held is forgotten (not released)
    /// when it is dropped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// `true` once `cancel()` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Acquire one token, or `None` if cancellation wins the race. Never
    /// blocks forever: a concurrent `cancel()` always unblocks a pending
    /// acquire.
    pub async fn acquire(&self) -> Option<SubmissionTicket> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = Arc::clone(&self.sem).acquire_owned() => {
                permit.ok().map(|p| SubmissionTicket {
                    permit: Some(p),
                    cancel: self.cancel.clone(),
                })
            }
        }
    }
}

/// A held submission slot. Released back to the semaphore on drop, unless
/// the semaphore was cancelled while this ticket was outstanding, in which
/// case the permit is forgotten (capacity shrinks by one permanently).
pub struct SubmissionTicket {
    permit: Option<OwnedSemaphorePermit>,
    cancel: CancelToken,
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            if self.cancel.is_cancelled() {
                permit.forget();
            }
            // else: normal Drop of `permit` releases it back to the semaphore.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_up_to_capacity() {
        let sem = CancellableSemaphore::new(2);
        let a = sem.acquire().await.expect("first acquire");
        let b = sem.acquire().await.expect("second acquire");
        drop(a);
        drop(b);
    }

    #[tokio::test]
    async fn cancelled_acquire_returns_none() {
        let sem = CancellableSemaphore::new(1);
        sem.cancel();
        assert!(sem.acquire().await.is_none());
    }

    #[tokio::test]
    async fn ticket_held_across_cancel_is_not_returned() {
        let sem = CancellableSemaphore::new(1);
        let ticket = sem.acquire().await.expect("acquire before cancel");
        sem.cancel();
        drop(ticket);
        // Capacity was forgotten, so a fresh (non-cancelled) semaphore
        // would be needed to acquire again; on this one, acquire short
        // circuits via cancellation regardless.
        assert!(sem.acquire().await.is_none());
    }

    #[tokio::test]
    async fn uncancelled_ticket_releases_normally() {
        let sem = CancellableSemaphore::new(1);
        let ticket = sem.acquire().await.unwrap();
        drop(ticket);
        assert!(sem.acquire().await.is_some());
    }
}
