use uuid::Uuid;

use crate::{
    metrics,
    models::{Task, TaskParams, TaskStatus},
};

use super::TaskStore;

impl TaskStore {
    /// Store a new `Pending` task and return its identifier.
    pub fn insert(&self, params: TaskParams) -> Uuid {
        let task = Task::new(params);
        let id = task.id;
        metrics::record_task_created(task.kind.as_str());
        self.tasks.insert(id, task);
        id
    }

    /// Copy of the task, if it exists.
    pub fn get(&self, id: &Uuid) -> Option<Task> {
        self.tasks.get(id).map(|t| t.value().clone())
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn status(&self, id: &Uuid) -> Option<TaskStatus> {
        self.tasks.get(id).map(|t| t.status)
    }

    pub fn params(&self, id: &Uuid) -> Option<TaskParams> {
        self.tasks.get(id).map(|t| t.params.clone())
    }
}
