//! Process-lifetime task registry (spec.md §4.5, §6.3 "stateless across
//! restarts" — nothing here is persisted).

use crate::task::AuthorityTask;
use dashmap::DashMap;
use fe_core::error::{Error, Result};
use fe_core::ids::TaskId;
use fe_runtime::TaskDaemon;
use std::sync::Arc;

/// Shared state handed to every axum handler.
#[derive(Clone)]
pub struct AuthorityState {
    tasks: Arc<DashMap<TaskId, Arc<AuthorityTask>>>,
    pub fh_multi_ipe_sec_level: u32,
    /// The node's task daemon (spec.md §4.1): `POST /task` submits the
    /// freshly-created `AuthorityTask` here rather than spawning it
    /// directly, so an overloaded authority rejects new work with
    /// `Error::Capacity` (→ `503`) instead of growing an unbounded set of
    /// detached setup workers.
    task_daemon: Arc<TaskDaemon<Arc<AuthorityTask>>>,
}

impl AuthorityState {
    pub fn new(fh_multi_ipe_sec_level: u32, task_chan_size: usize) -> Self {
        let sec_level = fh_multi_ipe_sec_level;
        let task_daemon = TaskDaemon::spawn(task_chan_size, move |task: Arc<AuthorityTask>| async move {
            task.run_setup(sec_level).await;
        });
        Self {
            tasks: Arc::new(DashMap::new()),
            fh_multi_ipe_sec_level,
            task_daemon: Arc::new(task_daemon),
        }
    }

    pub fn insert(&self, task: Arc<AuthorityTask>) {
        self.tasks.insert(task.task_id, task);
    }

    pub fn get(&self, task_id: TaskId) -> Result<Arc<AuthorityTask>> {
        self.tasks
            .get(&task_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_found(format!("unknown task {task_id}")))
    }

    /// Dispatch `task`'s schema setup through the task daemon (spec.md
    /// §4.1, §4.5). Returns `Error::Capacity` if the inbound queue is full.
    pub fn dispatch_setup(&self, task: Arc<AuthorityTask>) -> Result<()> {
        self.task_daemon.submit(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe_core::task_model::{BatchParams, EncryptionMode};

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let state = AuthorityState::new(1, 8);
        let err = state.get(TaskId::new()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn inserted_task_is_retrievable() {
        let state = AuthorityState::new(1, 8);
        let task_id = TaskId::new();
        let task = Arc::new(AuthorityTask::new(
            task_id,
            1,
            BatchParams { batch_size: 4, batch_cnt: 1 },
            10,
            5,
            EncryptionMode::Single,
        ));
        state.insert(task);
        assert!(state.get(task_id).is_ok());
    }

    #[tokio::test]
    async fn dispatch_setup_runs_through_the_task_daemon() {
        let state = AuthorityState::new(1, 8);
        let task_id = TaskId::new();
        let task = Arc::new(AuthorityTask::new(
            task_id,
            1,
            BatchParams { batch_size: 4, batch_cnt: 1 },
            10,
            5,
            EncryptionMode::Single,
        ));
        state.insert(Arc::clone(&task));
        state.dispatch_setup(task).unwrap();

        for _ in 0..50 {
            if state.get(task_id).unwrap().schema_status() == fe_core::status::SchemaStatus::Ready {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(state.get(task_id).unwrap().schema_status(), fe_core::status::SchemaStatus::Ready);
    }
}
