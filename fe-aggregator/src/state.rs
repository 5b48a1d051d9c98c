//! Shared aggregator state: registries, task table, and the handful of
//! config knobs every task orchestration run needs (spec.md §4.4, §6.3).

use crate::registry::Registry;
use crate::task::AggregatorTask;
use dashmap::DashMap;
use fe_core::error::{Error, Result};
use fe_core::ids::{SensorId, TaskId};
use fe_runtime::TaskDaemon;
use fe_wire::RemoteClient;
use std::sync::Arc;
use std::time::Duration;

/// One fully-resolved orchestration run, handed to the task daemon
/// (spec.md §4.1) instead of being spawned directly from the HTTP handler.
pub struct AggregatorTaskJob {
    pub task: Arc<AggregatorTask>,
    pub authority: RemoteClient,
    pub sensors: Vec<(SensorId, RemoteClient)>,
    pub schema_poll: Duration,
    pub decryption_poll: Duration,
}

#[derive(Clone)]
pub struct AggregatorState {
    pub registry: Arc<Registry>,
    tasks: Arc<DashMap<TaskId, Arc<AggregatorTask>>>,
    pub schema_params_polling_interval: Duration,
    pub decryption_params_polling_interval: Duration,
    pub cipher_wait_poll_multiple: u32,
    /// The node's task daemon (spec.md §4.1): `POST /task` submits the
    /// orchestration run here rather than spawning it directly, so an
    /// overloaded aggregator rejects new work with `Error::Capacity`
    /// (→ `503`) instead of growing an unbounded set of detached workers.
    task_daemon: Arc<TaskDaemon<AggregatorTaskJob>>,
}

impl AggregatorState {
    pub fn new(schema_poll: Duration, decryption_poll: Duration, task_chan_size: usize) -> Self {
        let task_daemon = TaskDaemon::spawn(task_chan_size, |job: AggregatorTaskJob| async move {
            job.task.run(job.authority, job.sensors, job.schema_poll, job.decryption_poll).await;
        });
        Self {
            registry: Arc::new(Registry::new()),
            tasks: Arc::new(DashMap::new()),
            schema_params_polling_interval: schema_poll,
            decryption_params_polling_interval: decryption_poll,
            cipher_wait_poll_multiple: fe_core::config::CIPHER_WAIT_POLL_MULTIPLE,
            task_daemon: Arc::new(task_daemon),
        }
    }

    pub fn insert_task(&self, task: Arc<AggregatorTask>) {
        self.tasks.insert(task.spec.task_id, task);
    }

    /// Dispatch a task's orchestration run through the task daemon
    /// (spec.md §4.1, §4.4). Returns `Error::Capacity` if the inbound
    /// queue is full.
    pub fn dispatch_run(&self, job: AggregatorTaskJob) -> Result<()> {
        self.task_daemon.submit(job)
    }

    pub fn task(&self, task_id: TaskId) -> Result<Arc<AggregatorTask>> {
        self.tasks
            .get(&task_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_found(format!("unknown task {task_id}")))
    }

    /// `POST /task` requires an authority to already be set (spec.md §8
    /// scenario 5): a missing authority at task-create time is a client
    /// precondition failure, not a lookup miss, so it maps to `400` rather
    /// than the `404` `Registry::authority` uses for its own callers.
    pub fn authority_client(&self) -> Result<RemoteClient> {
        let record = self.registry.authority().map_err(|_| Error::misuse("authority not set"))?;
        Ok(RemoteClient::new(record.ip))
    }

    /// Build one client per sensor the task references, resolved against
    /// the owning customer's sensor directory.
    pub fn sensor_clients(&self, customer_id: fe_core::ids::CustomerId, sensor_ids: &[SensorId]) -> Vec<(SensorId, RemoteClient)> {
        let Ok(customer) = self.registry.customer(customer_id) else { return Vec::new() };
        sensor_ids
            .iter()
            .filter_map(|&id| {
                customer
                    .sensors
                    .iter()
                    .find(|s| s.sensor_id == id)
                    .map(|record| (id, RemoteClient::new(record.ip.clone())))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe_core::ids::TariffId;
    use fe_core::task_model::{BatchParams, EncryptionMode, SamplingParams, TaskSpec};

    #[tokio::test]
    async fn dispatch_run_drives_the_task_through_the_task_daemon() {
        let state = AggregatorState::new(Duration::from_millis(20), Duration::from_millis(20), 8);
        let spec = TaskSpec {
            task_id: TaskId::new(),
            sensor_ids: vec![SensorId::new()],
            batch_params: BatchParams { batch_size: 4, batch_cnt: 1 },
            sampling_params: SamplingParams { start_unix: 0, sampling_period_ms: 1000, max_sample_value: 10 },
            max_tariff_value: 5,
            tariff_id: TariffId::new(),
            encryption_mode: EncryptionMode::Single,
        };
        let task_id = spec.task_id;
        let task = AggregatorTask::new(spec, fe_core::ids::CustomerId::new());
        state.insert_task(Arc::clone(&task));

        // No authority is actually listening; the run should observe a
        // transport failure at provisioning and mark the task failed,
        // proving the job reached `AggregatorTask::run` via the daemon.
        state
            .dispatch_run(AggregatorTaskJob {
                task: Arc::clone(&task),
                authority: RemoteClient::new("http://127.0.0.1:1"),
                sensors: Vec::new(),
                schema_poll: Duration::from_millis(20),
                decryption_poll: Duration::from_millis(20),
            })
            .unwrap();

        for _ in 0..100 {
            if task.is_failed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(task.is_failed());
        assert!(state.task(task_id).is_ok());
    }
}
