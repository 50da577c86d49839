//! Task store contract and in-memory implementation.

use crate::model::task::{ExtendedDetails, Task};
use log::info;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Core Task fields saved separately from the details block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCoreUpdate {
    pub title: String,
    pub description: String,
    pub status: String,
}

/// Errors from store writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Target Task does not exist in the store.
    TaskNotFound(String),
    /// Backend-specific failure.
    Backend(String),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::Backend(message) => write!(f, "task store failure: {message}"),
        }
    }
}

impl Error for PersistenceError {}

/// Save operations invoked by the editor on explicit confirmation.
///
/// The editor calls `update_core_info` first and `update_extended_details`
/// second. The two calls are not atomic: a failing second call leaves the
/// new core fields in place, and the editor reports that step.
pub trait TaskStore {
    /// Saves `title`, `description` and `status`.
    fn update_core_info(&mut self, task_id: &str, update: &TaskCoreUpdate)
        -> Result<(), PersistenceError>;
    /// Replaces the whole details block.
    fn update_extended_details(
        &mut self,
        task_id: &str,
        details: &ExtendedDetails,
    ) -> Result<(), PersistenceError>;
}

impl<S: TaskStore + ?Sized> TaskStore for &mut S {
    fn update_core_info(
        &mut self,
        task_id: &str,
        update: &TaskCoreUpdate,
    ) -> Result<(), PersistenceError> {
        (**self).update_core_info(task_id, update)
    }

    fn update_extended_details(
        &mut self,
        task_id: &str,
        details: &ExtendedDetails,
    ) -> Result<(), PersistenceError> {
        (**self).update_extended_details(task_id, details)
    }
}

/// Map-backed store keyed by Task id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: BTreeMap<String, Task>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces one Task.
    pub fn insert(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn task_mut(&mut self, task_id: &str) -> Result<&mut Task, PersistenceError> {
        self.tasks
            .get_mut(task_id)
            .ok_or_else(|| PersistenceError::TaskNotFound(task_id.to_string()))
    }
}

impl TaskStore for InMemoryTaskStore {
    fn update_core_info(
        &mut self,
        task_id: &str,
        update: &TaskCoreUpdate,
    ) -> Result<(), PersistenceError> {
        let task = self.task_mut(task_id)?;
        task.title = update.title.clone();
        task.description = update.description.clone();
        task.status = update.status.clone();
        info!(
            "event=task_core_saved module=task_store status=ok task_id={}",
            task_id
        );
        Ok(())
    }

    fn update_extended_details(
        &mut self,
        task_id: &str,
        details: &ExtendedDetails,
    ) -> Result<(), PersistenceError> {
        let task = self.task_mut(task_id)?;
        task.extended_details = Some(details.clone());
        info!(
            "event=task_details_saved module=task_store status=ok task_id={} substeps={}",
            task_id,
            details.sub_steps.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryTaskStore, PersistenceError, TaskCoreUpdate, TaskStore};
    use crate::model::task::{ExtendedDetails, Task};

    #[test]
    fn unknown_task_is_reported() {
        let mut store = InMemoryTaskStore::new();
        let err = store
            .update_extended_details("task-x", &ExtendedDetails::default())
            .unwrap_err();
        assert_eq!(err, PersistenceError::TaskNotFound("task-x".to_string()));
    }

    #[test]
    fn core_update_overwrites_three_fields() {
        let mut store = InMemoryTaskStore::new();
        store.insert(Task::new("task-1", "old"));
        store
            .update_core_info(
                "task-1",
                &TaskCoreUpdate {
                    title: "new".to_string(),
                    description: "desc".to_string(),
                    status: "in_progress".to_string(),
                },
            )
            .unwrap();

        let task = store.get("task-1").unwrap();
        assert_eq!(task.title, "new");
        assert_eq!(task.description, "desc");
        assert_eq!(task.status, "in_progress");
        assert!(task.extended_details.is_none());
    }
}
