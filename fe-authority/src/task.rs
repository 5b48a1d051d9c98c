//! Per-task authority state and the three operations in spec.md §4.5:
//! `create`, `getEncryptionParams`, `addDecryptionParams`.

use fe_core::error::{Error, Result};
use fe_core::ids::{DecryptionParamsId, TaskId};
use fe_core::status::{DecryptionStatus, SchemaStatus};
use fe_core::task_model::{BatchParams, EncryptionMode};
use fe_scheme::{DecryptionParams, EncryptionParams, MasterSecret, SchemaParams};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

/// One decryption-key derivation job (spec.md §3 `DecryptionJob`). A task
/// may accumulate many of these across tariff revisions; each is
/// independent once created.
pub struct DecryptionJob {
    pub id: DecryptionParamsId,
    status: Mutex<DecryptionStatus>,
    params: OnceCell<DecryptionParams>,
}

impl DecryptionJob {
    fn new(id: DecryptionParamsId) -> Self {
        Self { id, status: Mutex::new(DecryptionStatus::Created), params: OnceCell::new() }
    }

    pub fn status(&self) -> DecryptionStatus {
        *self.status.lock()
    }

    pub fn params(&self) -> Option<&DecryptionParams> {
        self.params.get()
    }
}

/// Authority-side projection of a task (spec.md §3, §4.5): the immutable
/// shape agreed with the aggregator plus the FE key material and
/// decryption jobs that accumulate over the task's lifetime.
pub struct AuthorityTask {
    pub task_id: TaskId,
    pub sensor_cnt: usize,
    pub batch_params: BatchParams,
    pub max_sample_value: u64,
    pub max_tariff_value: u64,
    pub encryption_mode: EncryptionMode,
    schema_status: Mutex<SchemaStatus>,
    /// Schema params + master secret, set once schema setup completes.
    fe: OnceCell<(SchemaParams, MasterSecret)>,
    /// First-successful-fetch timestamp per sensor (observability only;
    /// spec.md §4.5 "Records that the sensor fetched").
    fetched_at: Mutex<HashMap<usize, Instant>>,
    decryption_jobs: dashmap::DashMap<DecryptionParamsId, std::sync::Arc<DecryptionJob>>,
}

impl AuthorityTask {
    pub fn new(
        task_id: TaskId,
        sensor_cnt: usize,
        batch_params: BatchParams,
        max_sample_value: u64,
        max_tariff_value: u64,
        encryption_mode: EncryptionMode,
    ) -> Self {
        Self {
            task_id,
            sensor_cnt,
            batch_params,
            max_sample_value,
            max_tariff_value,
            encryption_mode,
            schema_status: Mutex::new(SchemaStatus::Created),
            fe: OnceCell::new(),
            fetched_at: Mutex::new(HashMap::new()),
            decryption_jobs: dashmap::DashMap::new(),
        }
    }

    pub fn schema_status(&self) -> SchemaStatus {
        *self.schema_status.lock()
    }

    /// `vec_len` the FE scheme expects for this task (`batchSize`).
    fn vec_len(&self) -> usize {
        self.batch_params.batch_size as usize
    }

    fn batch_cnt(&self) -> usize {
        self.batch_params.batch_cnt as usize
    }

    /// Total expected rate count (spec.md §3: `batchCnt·batchSize` single,
    /// `batchCnt·sensorCnt·batchSize` multi/none).
    pub fn total_rate_cnt(&self) -> usize {
        match self.encryption_mode {
            EncryptionMode::Single => self.vec_len() * self.batch_cnt(),
            EncryptionMode::Multi | EncryptionMode::None => {
                self.vec_len() * self.batch_cnt() * self.sensor_cnt
            }
        }
    }

    /// Run FE setup, recording elapsed time, and transition
    /// `schema_status` to `ready` or `error` (spec.md §4.5).
    pub async fn run_setup(&self, sec_level: u32) {
        if self.max_sample_value == 0 || self.vec_len() == 0 {
            warn!(task_id = %self.task_id, "schema setup rejected: degenerate vector shape");
            *self.schema_status.lock() = SchemaStatus::Error;
            return;
        }
        let mode = self.encryption_mode;
        let sensor_cnt = self.sensor_cnt;
        let batch_cnt = self.batch_cnt();
        let vec_len = self.vec_len();
        let bound_x = self.max_sample_value;
        let bound_y = self.max_tariff_value;

        let start = Instant::now();
        let setup_result = tokio::task::spawn_blocking(move || {
            fe_scheme::setup(mode, sensor_cnt, batch_cnt, vec_len, bound_x, bound_y, sec_level)
        })
        .await;

        match setup_result {
            Ok((schema, master)) => {
                let elapsed = start.elapsed();
                let _ = self.fe.set((schema, master));
                *self.schema_status.lock() = SchemaStatus::Ready;
                info!(task_id = %self.task_id, ?elapsed, "schema setup complete");
            }
            Err(err) => {
                warn!(task_id = %self.task_id, %err, "schema setup panicked");
                *self.schema_status.lock() = SchemaStatus::Error;
            }
        }
    }

    /// `getEncryptionParams(sensorIdx)` (spec.md §4.5).
    pub fn encryption_params(&self, sensor_idx: usize) -> Result<EncryptionParams> {
        if self.schema_status() != SchemaStatus::Ready {
            return Err(Error::Protocol("schema not ready".to_string()));
        }
        let (schema, master) = self
            .fe
            .get()
            .ok_or_else(|| Error::Internal("schema marked ready but params missing".to_string()))?;
        let params = fe_scheme::encryption_params(schema, master, sensor_idx, self.sensor_cnt, self.batch_cnt())
            .map_err(|err| Error::FeFailure(err.to_string()))?;
        self.fetched_at.lock().entry(sensor_idx).or_insert_with(Instant::now);
        Ok(params)
    }

    /// `addDecryptionParams(rates)` (spec.md §4.5): validate length,
    /// create a job, and launch the detached derivation worker.
    pub fn add_decryption_params(self: &std::sync::Arc<Self>, rates: Vec<u64>) -> Result<DecryptionParamsId> {
        if self.schema_status() != SchemaStatus::Ready {
            return Err(Error::Protocol("schema not ready".to_string()));
        }
        let expected = self.total_rate_cnt();
        if rates.len() != expected {
            return Err(Error::misuse(format!(
                "invalid rates count: expected {expected}, got {}",
                rates.len()
            )));
        }

        let job_id = DecryptionParamsId::new();
        let job = std::sync::Arc::new(DecryptionJob::new(job_id));
        self.decryption_jobs.insert(job_id, std::sync::Arc::clone(&job));

        let batch_size = self.vec_len();
        let rate_matrix: Vec<Vec<u64>> = rates.chunks(batch_size).map(|c| c.to_vec()).collect();
        let task = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            task.run_key_derivation(job, rate_matrix).await;
        });
        Ok(job_id)
    }

    async fn run_key_derivation(&self, job: std::sync::Arc<DecryptionJob>, rate_matrix: Vec<Vec<u64>>) {
        let Some((schema, master)) = self.fe.get() else {
            *job.status.lock() = DecryptionStatus::Error;
            return;
        };
        let schema = schema.clone();
        let master = master.clone();
        let result =
            tokio::task::spawn_blocking(move || fe_scheme::derive_key(&schema, &master, &rate_matrix)).await;
        match result {
            Ok(Ok(params)) => {
                let _ = job.params.set(params);
                *job.status.lock() = DecryptionStatus::Ready;
                info!(task_id = %self.task_id, decryption_params_id = %job.id, "decryption key derived");
            }
            Ok(Err(err)) => {
                warn!(task_id = %self.task_id, %err, "rate matrix rejected by FE scheme");
                *job.status.lock() = DecryptionStatus::Invalid;
            }
            Err(err) => {
                warn!(task_id = %self.task_id, %err, "key derivation panicked");
                *job.status.lock() = DecryptionStatus::Error;
            }
        }
    }

    pub fn decryption_job(&self, id: DecryptionParamsId) -> Option<std::sync::Arc<DecryptionJob>> {
        self.decryption_jobs.get(&id).map(|entry| std::sync::Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(mode: EncryptionMode, sensor_cnt: usize, batch_size: u32, batch_cnt: u32) -> std::sync::Arc<AuthorityTask> {
        std::sync::Arc::new(AuthorityTask::new(
            TaskId::new(),
            sensor_cnt,
            BatchParams { batch_size, batch_cnt },
            10,
            5,
            mode,
        ))
    }

    #[tokio::test]
    async fn setup_transitions_to_ready() {
        let task = spec(EncryptionMode::Single, 1, 4, 1);
        task.run_setup(1).await;
        assert_eq!(task.schema_status(), SchemaStatus::Ready);
        assert!(task.encryption_params(0).is_ok());
    }

    #[tokio::test]
    async fn setup_rejects_degenerate_vector() {
        let task = spec(EncryptionMode::Single, 1, 0, 1);
        task.run_setup(1).await;
        assert_eq!(task.schema_status(), SchemaStatus::Error);
    }

    #[tokio::test]
    async fn encryption_params_before_ready_is_protocol_error() {
        let task = spec(EncryptionMode::Multi, 2, 2, 2);
        let err = task.encryption_params(0).unwrap_err();
        assert_eq!(err.category(), fe_core::ErrorCategory::Protocol);
    }

    #[tokio::test]
    async fn add_decryption_params_rejects_wrong_length() {
        let task = spec(EncryptionMode::Single, 1, 4, 1);
        task.run_setup(1).await;
        let err = task.add_decryption_params(vec![1, 2, 3]).unwrap_err();
        assert!(err.is_user_error());
    }

    #[tokio::test]
    async fn add_decryption_params_derives_key() {
        let task = spec(EncryptionMode::Single, 1, 4, 1);
        task.run_setup(1).await;
        let job_id = task.add_decryption_params(vec![2, 0, 3, 5]).unwrap();
        // Give the detached worker a moment to finish (spawn_blocking is fast here).
        for _ in 0..50 {
            if task.decryption_job(job_id).unwrap().status() != DecryptionStatus::Created {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(task.decryption_job(job_id).unwrap().status(), DecryptionStatus::Ready);
    }
}
