//! Wall-clock-gated sampling loop (spec.md §4.3): draws one sample at a
//! time at strict `samplingPeriod` spacing and forwards it onto `sampleCh`,
//! where the task worker's batching aggregator collects it into a batch.

use crate::task_worker::SensorTask;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::debug;

/// Run the sampling loop for `task`, pushing one sample at a time into
/// `tx` until `batch_cnt * batch_size` samples are produced or the task
/// is cancelled.
pub async fn run(task: Arc<SensorTask>, tx: mpsc::Sender<u64>) {
    let batch_size = task.batch_params.batch_size as u64;
    let total_samples = batch_size * task.batch_params.batch_cnt as u64;
    let period_ms = task.sampling_params.sampling_period_ms;
    let start = UNIX_EPOCH + Duration::from_secs(task.sampling_params.start_unix.max(0) as u64);

    for sample_idx in 0..total_samples {
        let target = start + Duration::from_millis(sample_idx * period_ms);

        if let Ok(wait) = target.duration_since(SystemTime::now()) {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = task.runnable.closed() => {
                    debug!(task_id = %task.task_id, sample_idx, "sampler exiting: task cancelled while waiting");
                    return;
                }
            }
        }

        if task.runnable.is_cancelled() {
            return;
        }

        let value = task.sample_gen.read_sample(sample_idx, task.max_sample_value.max(1));

        if tx.send(value).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_worker::SensorTask;
    use fe_core::ids::{CustomerId, TaskId};
    use fe_core::task_model::{BatchParams, EncryptionMode, SamplingParams};

    #[tokio::test]
    async fn produces_batch_size_times_batch_cnt_samples() {
        let task = Arc::new(SensorTask::new(
            TaskId::new(),
            CustomerId::new(),
            0,
            1,
            BatchParams { batch_size: 2, batch_cnt: 2 },
            SamplingParams { start_unix: 0, sampling_period_ms: 1, max_sample_value: 10 },
            EncryptionMode::Multi,
            "http://authority".to_string(),
        ));
        let (tx, mut rx) = mpsc::channel(8);
        run(Arc::clone(&task), tx).await;

        let mut samples = Vec::new();
        while let Ok(item) = rx.try_recv() {
            samples.push(item);
        }
        assert_eq!(samples.len(), 4);
    }

    #[tokio::test]
    async fn stops_early_when_cancelled() {
        let task = Arc::new(SensorTask::new(
            TaskId::new(),
            CustomerId::new(),
            0,
            1,
            BatchParams { batch_size: 2, batch_cnt: 100 },
            SamplingParams { start_unix: 4102444800, sampling_period_ms: 1000, max_sample_value: 10 },
            EncryptionMode::Multi,
            "http://authority".to_string(),
        ));
        task.runnable.start();
        task.runnable.stop();
        let (tx, mut rx) = mpsc::channel(4);
        run(Arc::clone(&task), tx).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn spacing_respects_sampling_period() {
        let task = Arc::new(SensorTask::new(
            TaskId::new(),
            CustomerId::new(),
            0,
            1,
            BatchParams { batch_size: 3, batch_cnt: 1 },
            SamplingParams { start_unix: 0, sampling_period_ms: 20, max_sample_value: 10 },
            EncryptionMode::Single,
            "http://authority".to_string(),
        ));
        let (tx, mut rx) = mpsc::channel(8);
        let start = std::time::Instant::now();
        run(Arc::clone(&task), tx).await;
        let elapsed = start.elapsed();
        let mut samples = Vec::new();
        while let Ok(item) = rx.try_recv() {
            samples.push(item);
        }
        assert_eq!(samples.len(), 3);
        // Last sample lands at offset 2*period; generation must not
        // collapse the whole batch into a single instant.
        assert!(elapsed >= Duration::from_millis(35));
    }
}
