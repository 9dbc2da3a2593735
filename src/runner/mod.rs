//! Task lifecycle orchestration.
//!
//! [`TaskManager`] owns the registry, the concurrency cap and the handles of
//! running executions. A task that cannot get a slot when it is started is
//! failed on the spot; nothing waits for capacity.

mod executor;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::{DashMap, mapref::entry::Entry};
use futures_util::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    driver::ConversationUrlSink,
    dtos::TaskSnapshot,
    error::{TaskError, TaskResult},
    metrics,
    models::{FailureKind, Task, TaskParams, TaskStatus},
    store::{CancelOutcome, TaskFilter, TaskStore},
};

pub use executor::{ExecutionContext, Executor, PlatformExecutor};

/// Reason recorded when a cancellation request does not give one.
pub const DEFAULT_CANCEL_REASON: &str = "cancelled by caller";

/// Reason recorded when an execution is dropped before reporting an outcome.
pub const ABANDONED_REASON: &str = "execution abandoned before completion";

/// Handle of an execution in flight. Dropping it releases the slot.
struct RunningTask {
    lease: u64,
    token: CancellationToken,
    _permit: OwnedSemaphorePermit,
}

/// Removes the running handle when the execution ends, however it ends.
///
/// An execution dropped before its outcome was recorded fails the task, so
/// nothing stays running without a handle.
struct RunningGuard {
    store: Arc<TaskStore>,
    running: Arc<DashMap<Uuid, RunningTask>>,
    id: Uuid,
    lease: u64,
    settled: bool,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if !self.settled
            && self
                .store
                .fail(&self.id, FailureKind::Execution, ABANDONED_REASON)
                .is_ok()
        {
            log::warn!("Task {} abandoned before finishing", self.id);
        }
        let lease = self.lease;
        self.running.remove_if(&self.id, |_, task| task.lease == lease);
        metrics::set_running_tasks(self.running.len());
    }
}

/// A task that holds a slot and is marked running.
struct Started {
    id: Uuid,
    params: TaskParams,
    token: CancellationToken,
    guard: RunningGuard,
}

/// Records the conversation reference on the running task.
struct TaskProgress {
    store: Arc<TaskStore>,
    id: Uuid,
}

impl ConversationUrlSink for TaskProgress {
    fn conversation_url_ready(&self, url: &str) {
        self.store.record_conversation_url(&self.id, url);
    }
}

#[derive(Clone)]
pub struct TaskManager {
    store: Arc<TaskStore>,
    executor: Arc<dyn Executor>,
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    running: Arc<DashMap<Uuid, RunningTask>>,
    next_lease: Arc<AtomicU64>,
}

impl TaskManager {
    pub fn new(max_concurrent: usize, executor: Arc<dyn Executor>) -> Self {
        Self {
            store: Arc::new(TaskStore::new()),
            executor,
            slots: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            running: Arc::new(DashMap::new()),
            next_lease: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of executions currently holding a slot.
    pub fn running_count(&self) -> usize {
        self.max_concurrent - self.slots.available_permits()
    }

    /// Register a new pending task. Nothing runs until `execute` or `spawn`.
    pub fn create(&self, params: TaskParams) -> Uuid {
        let kind = params.kind();
        let id = self.store.insert(params);
        log::info!("Task {} created ({})", id, kind);
        id
    }

    /// Run the task to completion on the current task.
    ///
    /// Unknown ids are logged and ignored. A task that cannot get a slot is
    /// failed with a capacity error.
    pub async fn execute(&self, id: Uuid) {
        if let Some(started) = self.start(id) {
            self.run(started).await;
        }
    }

    /// Same as [`execute`](Self::execute) but on a background tokio task.
    ///
    /// The slot is reserved before returning, so capacity failures are
    /// recorded synchronously. Returns `None` when nothing was started.
    pub fn spawn(&self, id: Uuid) -> Option<JoinHandle<()>> {
        let started = self.start(id)?;
        let manager = self.clone();
        Some(tokio::spawn(async move { manager.run(started).await }))
    }

    fn start(&self, id: Uuid) -> Option<Started> {
        let Some(params) = self.store.params(&id) else {
            log::error!("Task {} not found, nothing to execute", id);
            return None;
        };
        if self.store.status(&id) != Some(TaskStatus::Pending) {
            log::warn!("Task {} is no longer pending, skipping execution", id);
            return None;
        }

        let permit = match self.slots.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                let err = TaskError::CapacityReached {
                    limit: self.max_concurrent,
                };
                log::warn!("Task {} rejected: {}", id, err);
                if let Err(e) = self.store.fail(&id, FailureKind::Capacity, err.to_string()) {
                    log::debug!("Task {} could not be marked as rejected: {}", id, e);
                }
                return None;
            }
        };

        // the handle is visible before the status flips so a cancel never
        // sees a running task without one; only one caller can reserve an id
        let token = CancellationToken::new();
        let lease = self.next_lease.fetch_add(1, Ordering::Relaxed);
        match self.running.entry(id) {
            Entry::Occupied(_) => {
                log::warn!("Task {} is already being started, skipping execution", id);
                return None;
            }
            Entry::Vacant(slot) => {
                slot.insert(RunningTask {
                    lease,
                    token: token.clone(),
                    _permit: permit,
                });
            }
        }
        let mut guard = RunningGuard {
            store: self.store.clone(),
            running: self.running.clone(),
            id,
            lease,
            settled: false,
        };
        if let Err(e) = self.store.mark_running(&id) {
            log::warn!("Task {} could not start: {}", id, e);
            guard.settled = true;
            return None;
        }
        metrics::set_running_tasks(self.running.len());
        log::info!("Task {} started", id);

        Some(Started {
            id,
            params,
            token,
            guard,
        })
    }

    async fn run(&self, started: Started) {
        let Started {
            id,
            params,
            token,
            mut guard,
        } = started;
        let ctx = ExecutionContext {
            task_id: id,
            params,
            token,
            progress: Arc::new(TaskProgress {
                store: self.store.clone(),
                id,
            }),
        };

        let outcome = AssertUnwindSafe(self.executor.run(ctx)).catch_unwind().await;
        let recorded = match outcome {
            Ok(Ok(output)) => {
                log::info!("Task {} completed", id);
                self.store.complete(&id, output)
            }
            Ok(Err(err)) => {
                log::error!("Task {} failed: {}", id, err);
                self.store.fail(&id, failure_kind(&err), err.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("Task {} panicked: {}", id, message);
                self.store
                    .fail(&id, FailureKind::Execution, format!("executor panicked: {}", message))
            }
        };
        if let Err(e) = recorded {
            // typically cancelled while the executor was finishing
            log::debug!("Task {} outcome not recorded: {}", id, e);
        }
        guard.settled = true;
        drop(guard);
    }

    pub fn get_status(&self, id: &Uuid) -> Option<TaskSnapshot> {
        self.store.get(id).map(TaskSnapshot::from)
    }

    /// Cancel a pending or running task.
    ///
    /// A running task has its token cancelled and is failed right away; the
    /// executor stops at its next await point. Finished tasks are left
    /// untouched and reported as a conflict.
    pub fn cancel(&self, id: &Uuid, reason: Option<&str>) -> TaskResult<TaskSnapshot> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_CANCEL_REASON);

        match self.store.begin_cancel(id, reason)? {
            CancelOutcome::Cancelled => log::info!("Task {} cancelled before start", id),
            CancelOutcome::NeedsInterrupt => {
                let token = self.running.get(id).map(|r| r.token.clone());
                match token {
                    Some(token) if !token.is_cancelled() => {
                        // record the reason before the executor can report its own failure
                        self.store.fail(id, FailureKind::Cancelled, reason)?;
                        token.cancel();
                        log::info!("Task {} interrupted: {}", id, reason);
                    }
                    _ => {
                        return Err(TaskError::InvalidState {
                            message: format!("task {} is finishing and cannot be cancelled", id),
                        });
                    }
                }
            }
        }

        self.get_status(id).ok_or(TaskError::TaskNotFound(*id))
    }

    /// Drop finished tasks older than `max_age`. Returns how many were removed.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let removed = self.store.sweep(max_age).len();
        if removed > 0 {
            log::info!("Swept {} finished tasks", removed);
        }
        metrics::record_sweep(removed);
        removed
    }

    /// Most recent tasks first.
    pub fn list(&self, status: Option<TaskStatus>, limit: usize) -> Vec<Task> {
        self.store.list(TaskFilter { status, limit })
    }
}

pub(crate) fn failure_kind(err: &TaskError) -> FailureKind {
    match err {
        TaskError::Timeout(_) => FailureKind::Timeout,
        TaskError::Cancelled(_) => FailureKind::Cancelled,
        TaskError::CapacityReached { .. } | TaskError::QueueFull => FailureKind::Capacity,
        _ => FailureKind::Execution,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
