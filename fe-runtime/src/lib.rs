//! Concurrency primitives shared by the authority, aggregator, and sensor
//! task pipelines: the `Runnable` lifecycle object (spec.md §4.2), the
//! per-node `TaskDaemon` dispatcher (spec.md §4.1), a cancellable
//! submission semaphore (spec.md §9 design note), and the `CancelToken`
//! building block they're built from.

#![forbid(unsafe_code)]

pub mod cancel;
pub mod cancellable_semaphore;
pub mod error;
pub mod runnable;
pub mod task_daemon;

pub use cancel::CancelToken;
pub use cancellable_semaphore::{CancellableSemaphore, SubmissionTicket};
pub use error::{Error, Result};
pub use runnable::{Runnable, RunnableState};
pub use task_daemon::TaskDaemon;
