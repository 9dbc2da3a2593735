use std::time::Duration;

use crate::common::*;
use interface_actions::models::TaskStatus;

#[tokio::test]
async fn test_sweep_zero_removes_only_finished_tasks() {
    let (manager, executor) = test_manager();
    let done = manager.create(send_params("done"));
    let failed = manager.create(send_params("boom"));
    let pending = manager.create(send_params("waiting"));
    let running = manager.create(send_params("hold"));
    manager.execute(done).await;
    manager.execute(failed).await;
    let handle = manager.spawn(running).unwrap();
    wait_for_status(&manager, running, TaskStatus::Running).await;

    assert_eq!(manager.sweep(Duration::ZERO), 2);

    assert!(manager.get_status(&done).is_none());
    assert!(manager.get_status(&failed).is_none());
    assert_eq!(
        manager.get_status(&pending).unwrap().status,
        TaskStatus::Pending
    );
    assert_eq!(
        manager.get_status(&running).unwrap().status,
        TaskStatus::Running
    );

    executor.release(1);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_sweep_keeps_recent_tasks() {
    let (manager, _executor) = test_manager();
    let id = manager.create(send_params("recent"));
    manager.execute(id).await;

    assert_eq!(manager.sweep(Duration::from_secs(3600)), 0);
    assert!(manager.get_status(&id).is_some());
}
