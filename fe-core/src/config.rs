//! Default configuration constants (spec.md §4.7), recovered from
//! `original_source/common/config.go`. Each binary exposes these as CLI
//! flag defaults rather than hardcoding them at call sites.

use std::time::Duration;

/// Security-level parameter passed to `setupMulti`.
pub const FH_MULTI_IPE_SEC_LEVEL: u32 = 1;

/// Submission semaphore capacity per sensor task (spec.md §4.3).
pub const SENSOR_MAX_PARALLEL_SUBMIT_BATCHES: usize = 3;

/// Aggregator and authority task-daemon inbound queue capacity (spec.md §4.1).
pub const SERVER_TASK_DAEMON_CHAN_SIZE: usize = 15;

/// Sensor task-daemon inbound queue capacity (spec.md §4.1).
pub const SENSOR_TASK_CHAN_SIZE: usize = 15;

/// `sampleCh` capacity = this coefficient times `batchSize` (spec.md §4.3).
pub const SENSOR_SAMPLING_CHAN_SIZE_COEFF: usize = 2;

/// `encryptionCh` capacity = this coefficient times `batchCnt` (spec.md §4.3).
pub const SENSOR_ENCRYPTION_CHAN_SIZE_COEFF: usize = 1;

/// Aggregator polling interval against the authority's schema status.
pub const SCHEMA_PARAMS_POLLING_INTERVAL: Duration = Duration::from_secs(10);

/// Sensor polling interval against the authority's encryption params.
pub const ENCRYPTION_PARAMS_POLLING_INTERVAL: Duration = Duration::from_secs(10);

/// Aggregator polling interval against the authority's decryption status.
pub const DECRYPTION_PARAMS_POLLING_INTERVAL: Duration = Duration::from_secs(5);

/// Bound (in polling intervals) on how long a cipher-accumulation handler
/// waits on the decryption-params signal before giving up (spec.md §4.4).
pub const CIPHER_WAIT_POLL_MULTIPLE: u32 = 12;
