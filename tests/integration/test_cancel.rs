use crate::common::*;
use interface_actions::{
    error::TaskError,
    models::{FailureKind, TaskStatus},
};

#[tokio::test]
async fn test_cancel_pending_task() {
    let (manager, executor) = test_manager();
    let id = manager.create(send_params("never runs"));

    let snapshot = manager.cancel(&id, Some("changed my mind")).unwrap();
    assert_eq!(snapshot.status, TaskStatus::Failed);
    assert_eq!(snapshot.failure_kind, Some(FailureKind::Cancelled));
    assert_eq!(snapshot.error_message.as_deref(), Some("changed my mind"));
    assert!(snapshot.execution_start_time.is_none());

    manager.execute(id).await;
    assert_eq!(executor.call_count(), 0);
    assert_eq!(manager.get_status(&id).unwrap().status, TaskStatus::Failed);
}

#[tokio::test]
async fn test_cancel_running_task_interrupts_executor() {
    let (manager, _executor) = test_manager();
    let id = manager.create(send_params("hold forever"));
    let handle = manager.spawn(id).unwrap();
    wait_for_status(&manager, id, TaskStatus::Running).await;

    let snapshot = manager.cancel(&id, None).unwrap();
    assert_eq!(snapshot.status, TaskStatus::Failed);
    assert_eq!(snapshot.failure_kind, Some(FailureKind::Cancelled));
    assert_eq!(snapshot.error_message.as_deref(), Some("cancelled by caller"));

    handle.await.unwrap();
    let task = manager.store().get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error_message.as_deref(), Some("cancelled by caller"));
    assert_eq!(manager.running_count(), 0);
}

#[tokio::test]
async fn test_cancel_finished_task_is_conflict() {
    let (manager, _executor) = test_manager();
    let id = manager.create(send_params("quick one"));
    manager.execute(id).await;

    let err = manager.cancel(&id, None).unwrap_err();
    assert!(matches!(err, TaskError::InvalidState { .. }));
    assert_eq!(
        manager.get_status(&id).unwrap().status,
        TaskStatus::Completed
    );
}

#[tokio::test]
async fn test_cancel_unknown_task() {
    let (manager, _executor) = test_manager();
    let err = manager.cancel(&uuid::Uuid::new_v4(), None).unwrap_err();
    assert!(matches!(err, TaskError::TaskNotFound(_)));
}
