use std::sync::Arc;
use std::time::{Duration, Instant};

use interface_actions::{
    config::Config,
    handlers::AppState,
    models::{SendMessageParams, Task, TaskParams, TaskStatus},
    runner::TaskManager,
    session::{SessionResolver, SnapshotFile},
    workers::{self, WorkQueue},
};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::stubs::{StubDriver, StubExecutor};

/// Create test configuration
pub fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.session_file = dir.join("session_state.json");
    config.download.skip_url_checks = false;
    config
}

/// Everything a test needs; dropping it stops the background workers.
pub struct TestApp {
    pub state: AppState,
    pub executor: StubExecutor,
    pub dir: tempfile::TempDir,
    _receiver: Option<mpsc::Receiver<Uuid>>,
    _shutdown: watch::Sender<bool>,
}

/// App state with a ready driver, the default configuration and a running
/// dispatcher.
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(true)
}

pub fn setup_test_app_with(driver_ready: bool) -> TestApp {
    build_test_app(driver_ready, None)
}

/// App state whose queue holds `queue_capacity` ids and is never drained.
pub fn setup_stalled_test_app(queue_capacity: usize) -> TestApp {
    build_test_app(true, Some(queue_capacity))
}

fn build_test_app(driver_ready: bool, stalled_queue: Option<usize>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let executor = StubExecutor::new();
    let manager = TaskManager::new(
        config.worker.max_concurrent_tasks,
        Arc::new(executor.clone()),
    );

    let (queue, receiver) =
        WorkQueue::new(stalled_queue.unwrap_or(config.worker.queue_capacity));
    let (shutdown, shutdown_rx) = watch::channel(false);
    let _receiver = match stalled_queue {
        Some(_) => Some(receiver),
        None => {
            tokio::spawn(workers::dispatch_loop(manager.clone(), receiver, shutdown_rx));
            None
        }
    };

    let sessions = Arc::new(SessionResolver::new(
        Vec::new(),
        Arc::new(SnapshotFile::new(config.session_file.clone())),
    ));

    let state = AppState {
        manager,
        queue,
        sessions,
        driver: Arc::new(StubDriver {
            ready: driver_ready,
        }),
        config: Arc::new(config),
        started_at: Instant::now(),
    };

    TestApp {
        state,
        executor,
        dir,
        _receiver,
        _shutdown: shutdown,
    }
}

/// Standalone manager with the default cap of 5.
pub fn test_manager() -> (TaskManager, StubExecutor) {
    let executor = StubExecutor::new();
    let manager = TaskManager::new(5, Arc::new(executor.clone()));
    (manager, executor)
}

pub fn send_params(message: &str) -> TaskParams {
    TaskParams::SendMessage(SendMessageParams {
        message: message.to_string(),
        platform: "manus".to_string(),
        conversation_url: None,
        wait_for_response: true,
        timeout_seconds: 60,
    })
}

/// Poll until `check` holds for the task or the timeout expires.
pub async fn wait_for_task<F>(manager: &TaskManager, id: Uuid, check: F) -> Task
where
    F: Fn(&Task) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let task = manager.store().get(&id).expect("task exists");
        if check(&task) {
            return task;
        }
        assert!(
            Instant::now() < deadline,
            "task {} stuck in {:?}",
            id,
            task.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_status(manager: &TaskManager, id: Uuid, status: TaskStatus) -> Task {
    wait_for_task(manager, id, |t| t.status == status).await
}
