//! In-memory task registry.
//!
//! Tasks are kept in a sharded map; every status transition happens while
//! holding the shard lock of the task it mutates, so concurrent handlers and
//! executors never observe a half-applied transition.

mod cleanup;
mod task_crud;
mod task_lifecycle;
mod task_query;

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::Task;

pub use task_lifecycle::CancelOutcome;
pub use task_query::TaskFilter;

/// Registry of every task known to this process.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: DashMap<Uuid, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks currently held, whatever their status.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
