//! Typed task persistence over [`SqliteStore`].

use tracing::info;
use uuid::Uuid;

use crate::core::error::StoreError;
use crate::core::store::records::{PlannedTaskList, TaskRecord};
use crate::core::store::{SqliteStore, TASK_TAG};

#[derive(Clone)]
pub struct TaskStore {
    store: SqliteStore,
}

impl TaskStore {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    pub async fn save(&self, task: &TaskRecord) -> Result<(), StoreError> {
        let body = serde_json::to_value(task)?;
        self.store
            .put(TASK_TAG, &task.task_id.to_string(), None, &body)
            .await
    }

    /// Persist every task in a planner-emitted list, returning how many were
    /// saved.
    pub async fn save_planned(&self, list: &PlannedTaskList) -> Result<usize, StoreError> {
        let mut saved = 0;
        for planned in &list.tasks {
            self.save(&TaskRecord::from_planned(planned.clone())).await?;
            saved += 1;
        }
        info!("saved {} planned task(s)", saved);
        Ok(saved)
    }

    pub async fn get(&self, task_id: Uuid) -> Result<Option<TaskRecord>, StoreError> {
        self.store
            .get(TASK_TAG, &task_id.to_string())
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    pub async fn query_all(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let mut tasks = Vec::new();
        for body in self.store.query_all(TASK_TAG).await? {
            tasks.push(serde_json::from_value(body)?);
        }
        Ok(tasks)
    }

    pub async fn delete(&self, task_id: Uuid) -> Result<bool, StoreError> {
        self.store.delete(TASK_TAG, &task_id.to_string()).await
    }
}
