//! Runnable lifecycle primitive (spec.md §4.2).
//!
//! Every pipeline worker — sensor sampler/encryptor, aggregator task
//! orchestrator, authority schema/key-derivation worker — owns one
//! `Runnable` and honors its contract: transition to `Running` on entry,
//! reach exactly one of `{Done, Stopped, Cancelled, Failed}` before
//! returning, and never transition again afterward.
//!
//! This replaces the source's ad-hoc state field + dedicated exit channel
//! (`internal/common/runnable.go`) with one state enum guarded by a mutex
//! plus one `tokio::sync::Notify`, in the shape of the teacher's
//! `CancelToken` (`cancel.rs`) generalized from a boolean to the full
//! six-state enum (spec.md §9 design note).

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Lifecycle state of a `Runnable` (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnableState {
    /// Constructed but not yet started.
    Created,
    /// `start()` has been called; the worker is active.
    Running,
    /// Completed normally via `done()`.
    Done,
    /// Stopped cooperatively via `stop()` before reaching a terminal state
    /// on its own; the worker observed cancellation and exited.
    Stopped,
    /// `stop()` was called before `start()`; the worker never ran.
    Cancelled,
    /// Terminated abnormally via `fail(err)`.
    Failed,
}

impl RunnableState {
    /// Whether this state is one of the four terminal states.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunnableState::Created | RunnableState::Running)
    }
}

/// Shared lifecycle handle. Cheap to clone; every clone refers to the same
/// underlying state.
#[derive(Clone)]
pub struct Runnable {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<RunnableState>,
    exit: Notify,
    label: String,
}

impl Runnable {
    /// Create a new `Runnable` in the `Created` state. `label` is used only
    /// for log lines (task id, sensor id, etc.) and carries no semantics.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(RunnableState::Created),
                exit: Notify::new(),
                label: label.into(),
            }),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> RunnableState {
        *self.inner.state.lock()
    }

    /// Transition `Created -> Running`. Returns `false` (and leaves the
    /// state as `Cancelled`) if `stop()` already ran — the caller must
    /// observe this and exit immediately without doing any work
    /// (spec.md §4.2 rule 1).
    pub fn start(&self) -> bool {
        let mut state = self.inner.state.lock();
        match *state {
            RunnableState::Created => {
                *state = RunnableState::Running;
                true
            }
            RunnableState::Cancelled => false,
            other => {
                warn!(label = %self.inner.label, ?other, "start() called on a Runnable past Created");
                false
            }
        }
    }

    /// Request cancellation. Idempotent: a `Runnable` that is `Created`
    /// moves to `Cancelled`; one that is `Running` moves to `Stopped`;
    /// anything already terminal is left untouched.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        match *state {
            RunnableState::Created => {
                *state = RunnableState::Cancelled;
                drop(state);
                self.inner.exit.notify_waiters();
            }
            RunnableState::Running => {
                *state = RunnableState::Stopped;
                drop(state);
                self.inner.exit.notify_waiters();
            }
            _ => {}
        }
    }

    /// Mark normal completion (`Running -> Done`). A no-op if the state is
    /// already terminal (idempotent across concurrent stop/done/fail, per
    /// spec.md §4.2 rule 2).
    pub fn done(&self) {
        let mut state = self.inner.state.lock();
        if *state == RunnableState::Running {
            *state = RunnableState::Done;
            drop(state);
            debug!(label = %self.inner.label, "runnable done");
            self.inner.exit.notify_waiters();
        }
    }

    /// Mark abnormal termination (`Running -> Failed`), logging `err`. A
    /// no-op if already terminal.
    pub fn fail(&self, err: impl std::fmt::Display) {
        let mut state = self.inner.state.lock();
        if !state.is_terminal() {
            *state = RunnableState::Failed;
            drop(state);
            warn!(label = %self.inner.label, %err, "runnable failed");
            self.inner.exit.notify_waiters();
        }
    }

    /// `true` once a terminal state has been reached.
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// `true` if stop/cancel has been requested — `Cancelled` or
    /// `Stopped`, whether or not the worker has actually exited yet.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.state(), RunnableState::Cancelled | RunnableState::Stopped)
    }

    /// Await the terminal transition. Returns immediately if already
    /// terminal. Used by callers that need to block until a task's
    /// pipeline has fully wound down (spec.md §4.2 rule 4: "close()" is
    /// folded into this wait rather than a separate release step, since
    /// `Notify::notify_waiters` already wakes every waiter exactly once
    /// per transition).
    pub async fn closed(&self) {
        loop {
            if self.is_terminal() {
                return;
            }
            self.inner.exit.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn normal_lifecycle_reaches_done() {
        let r = Runnable::new("test");
        assert!(r.start());
        r.done();
        assert_eq!(r.state(), RunnableState::Done);
        r.closed().await;
    }

    #[test]
    fn stop_before_start_yields_cancelled() {
        let r = Runnable::new("test");
        r.stop();
        assert_eq!(r.state(), RunnableState::Cancelled);
        assert!(!r.start());
    }

    #[test]
    fn stop_after_start_yields_stopped() {
        let r = Runnable::new("test");
        assert!(r.start());
        r.stop();
        assert_eq!(r.state(), RunnableState::Stopped);
    }

    #[test]
    fn done_after_fail_is_a_noop() {
        let r = Runnable::new("test");
        r.start();
        r.fail("boom");
        r.done();
        assert_eq!(r.state(), RunnableState::Failed);
    }

    #[test]
    fn only_one_terminal_transition_ever_sticks() {
        let r = Runnable::new("test");
        r.start();
        r.stop();
        r.fail("boom");
        assert_eq!(r.state(), RunnableState::Stopped);
    }

    #[tokio::test]
    async fn closed_returns_immediately_when_already_terminal() {
        let r = Runnable::new("test");
        r.start();
        r.done();
        tokio::time::timeout(std::time::Duration::from_millis(50), r.closed())
            .await
            .expect("closed() should not block once terminal");
    }
}
