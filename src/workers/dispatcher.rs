use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::{
    error::{TaskError, TaskResult},
    metrics,
    runner::TaskManager,
};

/// Bounded queue of task ids waiting to be started in the background.
#[derive(Clone)]
pub struct WorkQueue {
    sender: mpsc::Sender<Uuid>,
}

impl WorkQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Uuid>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Enqueue without waiting. A full queue is reported as [`TaskError::QueueFull`].
    pub fn submit(&self, id: Uuid) -> TaskResult<()> {
        match self.sender.try_send(id) {
            Ok(()) => {
                metrics::set_queued_tasks(self.len());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::record_queue_rejection();
                Err(TaskError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(TaskError::Internal("work queue is closed".to_string()))
            }
        }
    }

    /// Ids currently waiting.
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Background loop handing queued tasks to the manager.
///
/// Each task is started on its own tokio task; capacity is checked when it is
/// taken off the queue.
pub async fn dispatch_loop(
    manager: TaskManager,
    mut receiver: mpsc::Receiver<Uuid>,
    mut shutdown: watch::Receiver<bool>,
) {
    log::info!("Dispatcher: started");
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                log::info!("Dispatcher: shutdown signal received, exiting");
                return;
            }
            next = receiver.recv() => match next {
                Some(id) => {
                    metrics::set_queued_tasks(receiver.len());
                    if manager.spawn(id).is_none() {
                        log::debug!("Dispatcher: task {} was not started", id);
                    }
                }
                None => {
                    log::info!("Dispatcher: queue closed, exiting");
                    return;
                }
            }
        }
    }
}
