use std::collections::HashMap;

use crate::models::{Task, TaskStatus};

use super::TaskStore;

/// Listing options for [`TaskStore::list`].
#[derive(Debug, Clone, Copy)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub limit: usize,
}

impl TaskStore {
    /// Tasks matching `filter`, most recently created first.
    pub fn list(&self, filter: TaskFilter) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| filter.status.is_none_or(|s| entry.status == s))
            .map(|entry| entry.value().clone())
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks.truncate(filter.limit);
        tasks
    }

    /// Number of tasks per status. Statuses with no task are reported as 0.
    pub fn count_by_status(&self) -> HashMap<TaskStatus, usize> {
        let mut counts: HashMap<TaskStatus, usize> = [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ]
        .into_iter()
        .map(|s| (s, 0))
        .collect();
        for entry in self.tasks.iter() {
            *counts.entry(entry.status).or_default() += 1;
        }
        counts
    }
}
