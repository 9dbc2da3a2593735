use uuid::Uuid;

use crate::{
    error::{TaskError, TaskResult},
    metrics,
    models::{FailureKind, Task, TaskOutput, TaskStatus},
};

use super::TaskStore;

/// What a cancellation request did to the stored task.
#[derive(Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The task was pending and is now failed
    Cancelled,
    /// The task is running; its execution has to be interrupted
    NeedsInterrupt,
}

impl TaskStore {
    /// Apply `change` if the task is in one of the `from` states.
    ///
    /// Returns the previous status. The status check and the mutation happen
    /// under the same entry lock.
    fn transition<F>(&self, id: &Uuid, from: &[TaskStatus], change: F) -> TaskResult<TaskStatus>
    where
        F: FnOnce(&mut Task),
    {
        let mut entry = self
            .tasks
            .get_mut(id)
            .ok_or(TaskError::TaskNotFound(*id))?;
        let task = entry.value_mut();
        let previous = task.status;
        if !from.contains(&previous) {
            return Err(TaskError::InvalidState {
                message: format!("task {} is {}", id, previous),
            });
        }
        change(task);
        task.touch();
        if task.status != previous {
            metrics::record_status_transition(previous.as_str(), task.status.as_str());
        }
        Ok(previous)
    }

    /// `Pending -> Running`, recording the start time.
    pub fn mark_running(&self, id: &Uuid) -> TaskResult<()> {
        self.transition(id, &[TaskStatus::Pending], |task| {
            task.status = TaskStatus::Running;
            task.execution_start_time = Some(chrono::Utc::now());
            metrics::record_task_wait(
                task.kind.as_str(),
                (chrono::Utc::now() - task.created_at).num_milliseconds() as f64 / 1000.0,
            );
        })?;
        Ok(())
    }

    /// Record the conversation reference of a task that is still running.
    ///
    /// Returns false when the task is unknown or no longer running.
    pub fn record_conversation_url(&self, id: &Uuid, url: &str) -> bool {
        let recorded = self
            .transition(id, &[TaskStatus::Running], |task| {
                task.conversation_url = Some(url.to_string());
            })
            .is_ok();
        if recorded {
            log::info!("Task {}: conversation url ready: {}", id, url);
        }
        recorded
    }

    /// `Running -> Completed` with the execution output.
    pub fn complete(&self, id: &Uuid, output: TaskOutput) -> TaskResult<()> {
        self.transition(id, &[TaskStatus::Running], |task| {
            let now = chrono::Utc::now();
            task.status = TaskStatus::Completed;
            task.execution_end_time = Some(now);
            if output.conversation_url.is_some() {
                task.conversation_url = output.conversation_url.clone();
            }
            task.result = Some(output);
            observe_end(task, "completed");
        })?;
        Ok(())
    }

    /// `Pending | Running -> Failed` with a human readable reason.
    pub fn fail(&self, id: &Uuid, kind: FailureKind, message: impl Into<String>) -> TaskResult<()> {
        let message = message.into();
        self.transition(id, &[TaskStatus::Pending, TaskStatus::Running], |task| {
            task.status = TaskStatus::Failed;
            task.error_message = Some(message);
            task.failure_kind = Some(kind);
            if task.execution_start_time.is_some() {
                task.execution_end_time = Some(chrono::Utc::now());
            }
            observe_end(task, "failed");
        })?;
        match kind {
            FailureKind::Capacity => metrics::record_capacity_rejection(),
            FailureKind::Timeout => metrics::record_task_timeout(),
            FailureKind::Cancelled => metrics::record_task_cancelled(),
            FailureKind::Execution => {}
        }
        Ok(())
    }

    /// First half of a cancellation request.
    ///
    /// A pending task is failed right away. A running task is left untouched
    /// for the caller, which owns its cancellation token. Finished tasks are
    /// rejected.
    pub fn begin_cancel(&self, id: &Uuid, reason: &str) -> TaskResult<CancelOutcome> {
        match self.status(id) {
            None => Err(TaskError::TaskNotFound(*id)),
            Some(TaskStatus::Running) => Ok(CancelOutcome::NeedsInterrupt),
            Some(status) if status.is_terminal() => Err(TaskError::InvalidState {
                message: format!("task {} is already {}", id, status),
            }),
            Some(_) => match self.fail(id, FailureKind::Cancelled, reason) {
                Ok(()) => Ok(CancelOutcome::Cancelled),
                // started between the status read and the transition
                Err(TaskError::InvalidState { .. })
                    if self.status(id) == Some(TaskStatus::Running) =>
                {
                    Ok(CancelOutcome::NeedsInterrupt)
                }
                Err(e) => Err(e),
            },
        }
    }
}

fn observe_end(task: &Task, outcome: &str) {
    metrics::record_task_completed(outcome, task.kind.as_str());
    if let Some(seconds) = task.execution_time_seconds() {
        metrics::record_task_duration(task.kind.as_str(), outcome, seconds);
    }
}
