//! Per-task sensor state and the batching/encryption/submission pipeline
//! that consumes the sampler's output (spec.md §4.3).

use fe_core::ids::{CustomerId, TaskId};
use fe_core::rate_gen::RepeatedSequenceGenerator;
use fe_core::task_model::{BatchParams, EncryptionMode, SamplingParams};
use fe_runtime::{CancellableSemaphore, Runnable};
use fe_scheme::EncryptionParams;
use fe_wire::RemoteClient;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct SensorTask {
    pub task_id: TaskId,
    pub customer_id: CustomerId,
    pub sensor_idx: usize,
    pub sensor_cnt: usize,
    pub batch_params: BatchParams,
    pub sampling_params: SamplingParams,
    pub max_sample_value: u64,
    pub encryption_mode: EncryptionMode,
    pub authority_url: String,
    pub runnable: Runnable,
    pub sample_gen: RepeatedSequenceGenerator,
    samples: Mutex<Vec<u64>>,
    /// Per-batch fill/submission state exposed via `GET /task/{id}/samples`
    /// (spec.md §4.3.2): `(receivedSamplesCnt, isSubmitted)`.
    batch_status: Mutex<Vec<(usize, bool)>>,
    encryption_params: OnceCell<EncryptionParams>,
    submit_semaphore: CancellableSemaphore,
}

impl SensorTask {
    pub fn new(
        task_id: TaskId,
        customer_id: CustomerId,
        sensor_idx: usize,
        sensor_cnt: usize,
        batch_params: BatchParams,
        sampling_params: SamplingParams,
        encryption_mode: EncryptionMode,
        authority_url: String,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        task_id.0.hash(&mut hasher);
        sensor_idx.hash(&mut hasher);
        let seed = hasher.finish();
        let total_samples = batch_params.batch_size as usize * batch_params.batch_cnt as usize;

        Self {
            task_id,
            customer_id,
            sensor_idx,
            sensor_cnt,
            batch_params,
            max_sample_value: sampling_params.max_sample_value,
            sampling_params,
            encryption_mode,
            authority_url,
            runnable: Runnable::new(format!("sensor-task-{task_id}")),
            sample_gen: RepeatedSequenceGenerator::new(seed),
            samples: Mutex::new(vec![0; total_samples]),
            batch_status: Mutex::new(vec![(0, false); batch_params.batch_cnt as usize]),
            encryption_params: OnceCell::new(),
            submit_semaphore: CancellableSemaphore::new(fe_core::config::SENSOR_MAX_PARALLEL_SUBMIT_BATCHES),
        }
    }

    /// Record one sample at its global index (spec.md §4.3: "samples are
    /// appended to batches strictly in arrival order").
    fn record_sample(&self, idx: usize, value: u64) {
        if let Some(slot) = self.samples.lock().get_mut(idx) {
            *slot = value;
        }
    }

    pub fn samples_snapshot(&self) -> Vec<u64> {
        self.samples.lock().clone()
    }

    fn mark_batch_received(&self, batch_idx: usize, cnt: usize) {
        if let Some(entry) = self.batch_status.lock().get_mut(batch_idx) {
            entry.0 = cnt;
        }
    }

    fn mark_batch_submitted(&self, batch_idx: usize) {
        if let Some(entry) = self.batch_status.lock().get_mut(batch_idx) {
            entry.1 = true;
        }
    }

    /// `(batchIdx, receivedSamplesCnt, totalSamplesCnt, isSubmitted)` per
    /// batch, for `GET /task/{id}/samples` (spec.md §4.3.2).
    pub fn batch_fill_status(&self) -> Vec<(usize, usize, usize, bool)> {
        let batch_size = self.batch_params.batch_size as usize;
        self.batch_status
            .lock()
            .iter()
            .enumerate()
            .map(|(idx, &(received, submitted))| (idx, received, batch_size, submitted))
            .collect()
    }

    /// Drive sampling through to submission for this task (spec.md §4.3):
    /// a sampler stage feeds individual samples onto `sampleCh`, a batching
    /// aggregator collects them into batches on `encryptionCh`, and this
    /// loop fans each finished batch out to encryption/submission. Runs as
    /// a detached worker.
    pub async fn run(self: Arc<Self>, authority: RemoteClient, aggregator: RemoteClient, encryption_poll: Duration) {
        if !self.runnable.start() {
            return;
        }

        let sample_chan_size =
            fe_core::config::SENSOR_SAMPLING_CHAN_SIZE_COEFF * (self.batch_params.batch_size as usize).max(1);
        let (sample_tx, sample_rx) = mpsc::channel::<u64>(sample_chan_size);

        let batch_chan_size =
            fe_core::config::SENSOR_ENCRYPTION_CHAN_SIZE_COEFF * (self.batch_params.batch_cnt as usize).max(1);
        let (batch_tx, mut batch_rx) = mpsc::channel::<(usize, Vec<u64>)>(batch_chan_size);

        let sampler_task = Arc::clone(&self);
        let sampler_handle = tokio::spawn(crate::sampler::run(sampler_task, sample_tx));

        let batching_task = Arc::clone(&self);
        let batching_handle = tokio::spawn(batching_task.run_batching(sample_rx, batch_tx));

        while let Some((local_batch_idx, samples)) = batch_rx.recv().await {
            if self.runnable.is_cancelled() {
                break;
            }

            let Some(params) = self.wait_for_encryption_params(&authority, encryption_poll).await else {
                warn!(task_id = %self.task_id, "giving up: encryption params never became ready");
                break;
            };

            let Some(ticket) = self.submit_semaphore.acquire().await else {
                break;
            };
            let global_idx = self.sensor_idx * self.batch_params.batch_cnt as usize + local_batch_idx;
            let task_id = self.task_id;
            let sensor_idx = self.sensor_idx;
            let aggregator = aggregator.clone();
            let params = params.clone();
            let task = Arc::clone(&self);
            tokio::spawn(async move {
                let _ticket = ticket;
                match fe_scheme::encrypt(&params, local_batch_idx, global_idx, &samples) {
                    Ok(cipher) => {
                        let bytes = fe_wire::codec::encode_cipher(&cipher);
                        if let Err(err) =
                            aggregator.post_bytes(&format!("/task/{task_id}/{sensor_idx}"), bytes).await
                        {
                            warn!(%task_id, sensor_idx, local_batch_idx, %err, "cipher submission failed");
                        } else {
                            task.mark_batch_submitted(local_batch_idx);
                            info!(%task_id, sensor_idx, local_batch_idx, "cipher submitted");
                        }
                    }
                    Err(err) => warn!(%task_id, sensor_idx, local_batch_idx, %err, "batch encryption failed"),
                }
            });
        }

        let _ = sampler_handle.await;
        let _ = batching_handle.await;
        if self.runnable.is_cancelled() {
            return;
        }
        self.runnable.done();
    }

    /// Batching aggregator (spec.md §4.3): consumes samples off `sampleCh`
    /// in arrival order, appends each to the current batch, and on fill
    /// pushes the batch onto `encryptionCh` and advances. Closes
    /// `encryptionCh` once the final batch has been pushed.
    async fn run_batching(self: Arc<Self>, mut sample_rx: mpsc::Receiver<u64>, batch_tx: mpsc::Sender<(usize, Vec<u64>)>) {
        let batch_size = self.batch_params.batch_size as usize;
        let batch_cnt = self.batch_params.batch_cnt as usize;
        let mut current_batch_idx = 0usize;
        let mut current: Vec<u64> = Vec::with_capacity(batch_size);

        while let Some(sample) = sample_rx.recv().await {
            if self.runnable.is_cancelled() {
                return;
            }

            let global_idx = current_batch_idx * batch_size + current.len();
            self.record_sample(global_idx, sample);
            current.push(sample);
            self.mark_batch_received(current_batch_idx, current.len());

            if current.len() == batch_size {
                let batch = std::mem::replace(&mut current, Vec::with_capacity(batch_size));
                if batch_tx.send((current_batch_idx, batch)).await.is_err() {
                    return;
                }
                current_batch_idx += 1;
                if current_batch_idx == batch_cnt {
                    return;
                }
            }
        }
    }

    /// Fetch and cache encryption params once (spec.md §4.3): every batch
    /// after the first reuses the cached value.
    async fn wait_for_encryption_params(&self, authority: &RemoteClient, poll: Duration) -> Option<EncryptionParams> {
        if let Some(params) = self.encryption_params.get() {
            return Some(params.clone());
        }
        loop {
            if self.runnable.is_cancelled() {
                return None;
            }
            match authority.get_bytes(&format!("/encryption/{}/{}", self.task_id, self.sensor_idx)).await {
                Ok(bytes) => match fe_wire::codec::decode_encryption_params(&bytes) {
                    Ok(params) => {
                        let _ = self.encryption_params.set(params.clone());
                        return Some(params);
                    }
                    Err(err) => warn!(task_id = %self.task_id, %err, "malformed encryption params from authority"),
                },
                Err(_) => {}
            }
            tokio::select! {
                _ = tokio::time::sleep(poll) => {}
                _ = self.runnable.closed() => return None,
            }
        }
    }

    pub fn cancel(&self) {
        self.runnable.stop();
        self.submit_semaphore.cancel();
    }
}
