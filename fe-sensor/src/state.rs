//! Shared sensor state: the customer/aggregator this sensor has been
//! bound to (each set exactly once, spec.md §4.3) and the live task table.

use crate::task_worker::SensorTask;
use dashmap::DashMap;
use fe_core::error::{Error, Result};
use fe_core::ids::{CustomerId, SensorId, TaskId};
use fe_runtime::TaskDaemon;
use fe_wire::RemoteClient;
use once_cell::sync::OnceCell;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// One task's sampling/encryption/submission pipeline, handed to the task
/// daemon (spec.md §4.1) instead of being spawned directly from the HTTP
/// handler.
pub struct SensorTaskJob {
    pub task: Arc<SensorTask>,
    pub authority: RemoteClient,
    pub aggregator: RemoteClient,
    pub encryption_params_poll: Duration,
}

#[derive(Clone)]
pub struct SensorState {
    pub sensor_id: SensorId,
    pub advertise_ip: IpAddr,
    customer_id: Arc<OnceCell<CustomerId>>,
    aggregator: Arc<OnceCell<RemoteClient>>,
    tasks: Arc<DashMap<TaskId, Arc<SensorTask>>>,
    pub encryption_params_polling_interval: Duration,
    /// The node's task daemon (spec.md §4.1): `POST /task` submits the
    /// sampling/encryption/submission pipeline here rather than spawning
    /// it directly, so an oversubscribed sensor rejects new task
    /// assignments with `Error::Capacity` (→ `503`) instead of growing an
    /// unbounded set of detached pipelines.
    task_daemon: Arc<TaskDaemon<SensorTaskJob>>,
}

impl SensorState {
    pub fn new(advertise_ip: IpAddr, encryption_params_polling_interval: Duration, task_chan_size: usize) -> Self {
        let task_daemon = TaskDaemon::spawn(task_chan_size, |job: SensorTaskJob| async move {
            job.task.run(job.authority, job.aggregator, job.encryption_params_poll).await;
        });
        Self {
            sensor_id: SensorId::new(),
            advertise_ip,
            customer_id: Arc::new(OnceCell::new()),
            aggregator: Arc::new(OnceCell::new()),
            tasks: Arc::new(DashMap::new()),
            encryption_params_polling_interval,
            task_daemon: Arc::new(task_daemon),
        }
    }

    /// Dispatch a task's pipeline through the task daemon (spec.md §4.1,
    /// §4.3). Returns `Error::Capacity` if the inbound queue is full.
    pub fn dispatch_run(&self, job: SensorTaskJob) -> Result<()> {
        self.task_daemon.submit(job)
    }

    /// `POST /customer` (spec.md §6.4): one-shot, idempotent on a matching
    /// id, rejected on a conflicting one.
    pub fn set_customer(&self, customer_id: CustomerId) -> Result<()> {
        match self.customer_id.get() {
            Some(existing) if *existing == customer_id => Ok(()),
            Some(_) => Err(Error::Protocol("customer already set to a different id".to_string())),
            None => {
                let _ = self.customer_id.set(customer_id);
                Ok(())
            }
        }
    }

    pub fn customer_id(&self) -> Result<CustomerId> {
        self.customer_id.get().copied().ok_or_else(|| Error::not_found("customer not set".to_string()))
    }

    /// `POST /server` (spec.md §6.4): one-shot, idempotent on a matching
    /// address, rejected on a conflicting one.
    pub fn set_aggregator(&self, base_url: String) -> Result<()> {
        match self.aggregator.get() {
            Some(existing) if existing.base_url() == base_url => Ok(()),
            Some(_) => Err(Error::Protocol("aggregator already set to a different address".to_string())),
            None => {
                let _ = self.aggregator.set(RemoteClient::new(base_url));
                Ok(())
            }
        }
    }

    pub fn aggregator(&self) -> Result<RemoteClient> {
        self.aggregator.get().cloned().ok_or_else(|| Error::not_found("aggregator not set".to_string()))
    }

    pub fn insert_task(&self, task: Arc<SensorTask>) {
        self.tasks.insert(task.task_id, task);
    }

    pub fn task(&self, task_id: TaskId) -> Result<Arc<SensorTask>> {
        self.tasks
            .get(&task_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_found(format!("unknown task {task_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_worker::SensorTask;
    use fe_core::ids::{CustomerId as Cust, TaskId as Tid};
    use fe_core::task_model::{BatchParams, EncryptionMode, SamplingParams};

    #[tokio::test]
    async fn dispatch_run_drives_the_task_through_the_task_daemon() {
        let state = SensorState::new(
            "127.0.0.1".parse().unwrap(),
            Duration::from_millis(10),
            8,
        );
        let task = Arc::new(SensorTask::new(
            Tid::new(),
            Cust::new(),
            0,
            1,
            BatchParams { batch_size: 2, batch_cnt: 1 },
            SamplingParams { start_unix: 0, sampling_period_ms: 1, max_sample_value: 10 },
            EncryptionMode::Single,
            "http://127.0.0.1:1".to_string(),
        ));
        state.insert_task(Arc::clone(&task));

        state
            .dispatch_run(SensorTaskJob {
                task: Arc::clone(&task),
                authority: RemoteClient::new("http://127.0.0.1:1"),
                aggregator: RemoteClient::new("http://127.0.0.1:1"),
                encryption_params_poll: Duration::from_millis(10),
            })
            .unwrap();

        // No authority is listening, so the pipeline parks on the
        // encryption-params latch; cancel it and confirm the daemon-spawned
        // run actually reached the task (proving the wiring, not just the
        // submit call).
        tokio::time::sleep(Duration::from_millis(30)).await;
        task.cancel();

        for _ in 0..100 {
            if task.runnable.state().is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(task.runnable.state().is_terminal());
    }
}
