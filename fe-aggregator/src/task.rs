//! Per-task orchestration (spec.md §4.4): provision the authority, fan the
//! task out to every sensor, submit the tariff's rate vector once the
//! schema is ready, and accumulate ciphertexts into a final result.

use dashmap::DashMap;
use fe_core::error::{Error, Result};
use fe_core::ids::{CustomerId, DecryptionParamsId, SensorId, TaskId};
use fe_core::rate_gen::RepeatedSequenceGenerator;
use fe_core::status::{DecryptionStatus, SchemaStatus};
use fe_core::task_model::TaskSpec;
use fe_runtime::Runnable;
use fe_scheme::{Cipher, DecryptionParams, FeDecryptor};
use fe_wire::dto::{AddRatesResponse, AuthorityTaskRequest, DecryptionStatusResponse, SchemaStatusResponse, SensorTaskRequest};
use fe_wire::RemoteClient;
use num_traits::ToPrimitive;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{info, warn};

/// One in-flight task, shared between the orchestration worker and every
/// HTTP handler that touches it.
pub struct AggregatorTask {
    pub spec: TaskSpec,
    pub customer_id: CustomerId,
    runnable: Runnable,
    submitted: DashMap<SensorId, bool>,
    cipher_counts: DashMap<SensorId, usize>,
    rate_gen: RepeatedSequenceGenerator,
    decryption_params_id: OnceCell<DecryptionParamsId>,
    decryptor: Mutex<Option<FeDecryptor>>,
    decryptor_ready: Notify,
    decryptor_ready_flag: AtomicBool,
    key_derivation_started: Instant,
    key_derivation_elapsed: OnceCell<Duration>,
    result: OnceCell<i64>,
}

impl AggregatorTask {
    pub fn new(spec: TaskSpec, customer_id: CustomerId) -> Arc<Self> {
        let submitted = DashMap::new();
        let cipher_counts = DashMap::new();
        for &sensor_id in &spec.sensor_ids {
            submitted.insert(sensor_id, false);
            cipher_counts.insert(sensor_id, 0);
        }
        // Seed from the tariff id so distinct tariffs draw distinct sequences,
        // per fe_core::rate_gen's documented convention.
        let mut hasher = DefaultHasher::new();
        spec.tariff_id.0.hash(&mut hasher);
        let seed = hasher.finish();

        Arc::new(Self {
            spec,
            customer_id,
            runnable: Runnable::new("aggregator-task"),
            submitted,
            cipher_counts,
            rate_gen: RepeatedSequenceGenerator::new(seed),
            decryption_params_id: OnceCell::new(),
            decryptor: Mutex::new(None),
            decryptor_ready: Notify::new(),
            decryptor_ready_flag: AtomicBool::new(false),
            key_derivation_started: Instant::now(),
            key_derivation_elapsed: OnceCell::new(),
            result: OnceCell::new(),
        })
    }

    /// `(sensorId, taskSubmitted, submittedCipherCnt)` per sensor (spec.md
    /// §4.4.1).
    pub fn submission_status(&self) -> Vec<(SensorId, bool, usize)> {
        self.submitted
            .iter()
            .map(|entry| {
                let sensor_id = *entry.key();
                let cipher_cnt = self.cipher_counts.get(&sensor_id).map(|c| *c).unwrap_or(0);
                (sensor_id, *entry.value(), cipher_cnt)
            })
            .collect()
    }

    pub fn key_derivation_elapsed(&self) -> Option<Duration> {
        self.key_derivation_elapsed.get().copied()
    }

    pub fn remaining_slots(&self) -> usize {
        if let Some(result) = self.result.get() {
            let _ = result;
            return 0;
        }
        match self.decryptor.lock().as_ref() {
            Some(decryptor) => decryptor.remaining_slots(),
            None => fe_scheme::expected_slots(self.spec.encryption_mode, self.spec.sensor_ids.len(), self.spec.batch_params.batch_cnt as usize),
        }
    }

    pub fn result(&self) -> Option<i64> {
        self.result.get().copied()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.runnable.state(), fe_runtime::RunnableState::Failed | fe_runtime::RunnableState::Stopped)
    }

    /// Drive the task from creation through to a final result, or failure
    /// (spec.md §4.4). Runs as a detached worker spawned by the caller.
    pub async fn run(
        self: Arc<Self>,
        authority: RemoteClient,
        sensors: Vec<(SensorId, RemoteClient)>,
        schema_poll: Duration,
        decryption_poll: Duration,
    ) {
        if !self.runnable.start() {
            return;
        }

        if let Err(err) = self.provision_authority(&authority, schema_poll).await {
            warn!(task_id = %self.spec.task_id, %err, "schema provisioning failed");
            self.runnable.fail(err);
            self.notify_sensors_cancel(&sensors).await;
            return;
        }

        self.submit_to_sensors(&authority, &sensors).await;

        if let Err(err) = self.submit_rates_and_wait(&authority, decryption_poll).await {
            warn!(task_id = %self.spec.task_id, %err, "key derivation failed");
            self.runnable.fail(err);
            self.notify_sensors_cancel(&sensors).await;
            return;
        }

        self.runnable.done();
    }

    async fn provision_authority(&self, authority: &RemoteClient, poll: Duration) -> Result<()> {
        let req = AuthorityTaskRequest {
            task_id: self.spec.task_id,
            sensor_cnt: self.spec.sensor_ids.len(),
            batch_params: self.spec.batch_params,
            max_sample_value: self.spec.sampling_params.max_sample_value,
            max_tariff_value: self.spec.max_tariff_value,
            encryption_mode: self.spec.encryption_mode,
        };
        let _: SchemaStatusResponse = authority.post_json("/task", &req).await?;

        loop {
            let status: SchemaStatusResponse =
                authority.get_json(&format!("/schema-status/{}", self.spec.task_id)).await?;
            match status.status {
                SchemaStatus::Ready => return Ok(()),
                SchemaStatus::Error => return Err(Error::FeFailure("authority schema setup failed".to_string())),
                SchemaStatus::Created => tokio::time::sleep(poll).await,
            }
        }
    }

    /// Sequential fan-out (spec.md §4.4 item 2): a single sensor's
    /// rejection does not abort the others.
    async fn submit_to_sensors(&self, authority: &RemoteClient, sensors: &[(SensorId, RemoteClient)]) {
        for (idx, sensor_id) in self.spec.sensor_ids.iter().enumerate() {
            let Some((_, client)) = sensors.iter().find(|(id, _)| id == sensor_id) else {
                warn!(task_id = %self.spec.task_id, %sensor_id, "no client configured for sensor, skipping");
                continue;
            };
            let req = SensorTaskRequest {
                task_id: self.spec.task_id,
                customer_id: self.customer_id,
                sensor_idx: idx,
                sensor_cnt: self.spec.sensor_ids.len(),
                batch_params: self.spec.batch_params,
                sampling_params: self.spec.sampling_params,
                max_sample_value: self.spec.sampling_params.max_sample_value,
                encryption_mode: self.spec.encryption_mode,
                authority_url: authority.base_url().to_string(),
            };
            match client.post_json_empty("/task", &req).await {
                Ok(()) => {
                    self.submitted.insert(*sensor_id, true);
                    info!(task_id = %self.spec.task_id, %sensor_id, "sensor task submitted");
                }
                Err(err) => {
                    warn!(task_id = %self.spec.task_id, %sensor_id, %err, "sensor rejected task submission");
                }
            }
        }
    }

    /// Materialize the tariff's rate vector, submit it, poll for the
    /// derived key, then fetch and cache the decryption params so
    /// cipher-submission handlers can start accumulating (spec.md §4.4
    /// item 3, §4.6).
    async fn submit_rates_and_wait(&self, authority: &RemoteClient, poll: Duration) -> Result<()> {
        let rates = self.rate_gen.materialize(self.spec.total_rate_cnt(), self.spec.max_tariff_value + 1);
        let body = fe_wire::codec::encode_rates(&rates);
        let resp: AddRatesResponse =
            authority.post_bytes_for_json(&format!("/rates/{}", self.spec.task_id), body).await?;
        let decryption_params_id = resp.decryption_params_id;
        let _ = self.decryption_params_id.set(decryption_params_id);

        loop {
            let status: DecryptionStatusResponse = authority
                .get_json(&format!("/decryption-status/{}/{decryption_params_id}", self.spec.task_id))
                .await?;
            match status.status {
                DecryptionStatus::Ready => break,
                DecryptionStatus::Invalid => {
                    return Err(Error::FeFailure("rate vector rejected by authority (dimension mismatch)".to_string()))
                }
                DecryptionStatus::Error => return Err(Error::FeFailure("key derivation failed".to_string())),
                DecryptionStatus::Created => tokio::time::sleep(poll).await,
            }
        }

        let params_bytes = authority
            .get_bytes(&format!("/decryption/{}/{decryption_params_id}", self.spec.task_id))
            .await?;
        let params: DecryptionParams =
            fe_wire::codec::decode_decryption_params(&params_bytes).map_err(Error::from)?;
        let expected = fe_scheme::expected_slots(
            self.spec.encryption_mode,
            self.spec.sensor_ids.len(),
            self.spec.batch_params.batch_cnt as usize,
        );
        *self.decryptor.lock() = Some(FeDecryptor::new(params, expected));
        let _ = self.key_derivation_elapsed.set(self.key_derivation_started.elapsed());
        self.decryptor_ready_flag.store(true, Ordering::SeqCst);
        self.decryptor_ready.notify_waiters();
        Ok(())
    }

    async fn notify_sensors_cancel(&self, sensors: &[(SensorId, RemoteClient)]) {
        for (sensor_id, client) in sensors {
            if let Err(err) = client.post_json_empty::<()>(&format!("/task/{}/cancel", self.spec.task_id), &()).await
            {
                warn!(task_id = %self.spec.task_id, %sensor_id, %err, "failed to notify sensor of task cancellation");
            }
        }
    }

    /// Accept one ciphertext (`POST /task/{taskId}/{sensorId}`). Waits,
    /// bounded, for the decryptor to become ready — the first sensor can
    /// submit before key derivation finishes (spec.md §4.4 item 4).
    pub async fn accept_cipher(
        &self,
        sensor_id: SensorId,
        cipher: Cipher,
        poll: Duration,
        wait_multiple: u32,
    ) -> Result<Option<i64>> {
        if !self.decryptor_ready_flag.load(Ordering::SeqCst) {
            let bound = poll * wait_multiple;
            if tokio::time::timeout(bound, self.decryptor_ready.notified()).await.is_err()
                && !self.decryptor_ready_flag.load(Ordering::SeqCst)
            {
                return Err(Error::Capacity("decryption parameters not ready".to_string()));
            }
        }

        let scalar = {
            let mut guard = self.decryptor.lock();
            let decryptor = guard
                .as_mut()
                .ok_or_else(|| Error::Capacity("decryption parameters not ready".to_string()))?;
            decryptor.add_cipher(cipher).map_err(|err| Error::FeFailure(err.to_string()))?
        };
        *self.cipher_counts.entry(sensor_id).or_insert(0) += 1;

        let Some(scalar) = scalar else { return Ok(None) };
        let value = scalar.to_i64().ok_or_else(|| Error::Internal("result overflowed i64".to_string()))?;
        let _ = self.result.set(value);
        info!(task_id = %self.spec.task_id, result = value, "task result computed");
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe_core::ids::TariffId;
    use fe_core::task_model::{BatchParams, EncryptionMode, SamplingParams};

    fn spec(mode: EncryptionMode) -> TaskSpec {
        TaskSpec {
            task_id: TaskId::new(),
            sensor_ids: vec![SensorId::new()],
            batch_params: BatchParams { batch_size: 4, batch_cnt: 1 },
            sampling_params: SamplingParams { start_unix: 0, sampling_period_ms: 1000, max_sample_value: 10 },
            max_tariff_value: 5,
            tariff_id: TariffId::new(),
            encryption_mode: mode,
        }
    }

    #[test]
    fn new_task_tracks_unsubmitted_sensors() {
        let task = AggregatorTask::new(spec(EncryptionMode::Single), CustomerId::new());
        assert_eq!(task.submission_status().iter().filter(|(_, submitted, _)| !submitted).count(), 1);
    }

    #[tokio::test]
    async fn accept_cipher_before_decryptor_ready_times_out() {
        let task_spec = spec(EncryptionMode::Single);
        let sensor_id = task_spec.sensor_ids[0];
        let task = AggregatorTask::new(task_spec, CustomerId::new());
        let cipher = Cipher::None(fe_scheme::none::encrypt_none(0, &[1, 2, 3, 4]));
        let err = task
            .accept_cipher(sensor_id, cipher, Duration::from_millis(10), 1)
            .await
            .unwrap_err();
        assert_eq!(err.category(), fe_core::ErrorCategory::Capacity);
    }

    #[tokio::test]
    async fn accept_cipher_completes_single_mode_task() {
        let task_spec = spec(EncryptionMode::Single);
        let sensor_id = task_spec.sensor_ids[0];
        let (schema, master) = fe_scheme::setup(EncryptionMode::Single, 1, 1, 4, 10, 5, 1);
        let enc_params = fe_scheme::encryption_params(&schema, &master, 0, 1, 1).unwrap();
        let cipher = fe_scheme::encrypt(&enc_params, 0, 0, &[3, 1, 4, 1]).unwrap();
        let dec_params = fe_scheme::derive_key(&schema, &master, &[vec![2, 0, 3, 5]]).unwrap();

        let task = AggregatorTask::new(task_spec, CustomerId::new());
        *task.decryptor.lock() = Some(FeDecryptor::new(dec_params, 1));
        task.decryptor_ready_flag.store(true, Ordering::SeqCst);

        let result = task.accept_cipher(sensor_id, cipher, Duration::from_millis(10), 1).await.unwrap();
        assert_eq!(result, Some(23));
        assert_eq!(task.result(), Some(23));
        assert_eq!(task.submission_status().iter().find(|(id, _, _)| *id == sensor_id).unwrap().2, 1);
    }
}
