use tokio::sync::watch;

use crate::{config::WorkerConfig, runner::TaskManager};

/// Periodically drops finished tasks older than `task_max_age`.
pub async fn retention_sweep_loop(
    manager: TaskManager,
    config: WorkerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    log::info!(
        "Retention sweep: interval={}s, max_age={}s",
        config.sweep_interval.as_secs(),
        config.task_max_age.as_secs()
    );

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                log::info!("Retention sweep: shutdown signal received, exiting");
                return;
            }
            _ = tokio::time::sleep(config.sweep_interval) => {}
        }

        let start = std::time::Instant::now();
        let removed = manager.sweep(config.task_max_age);
        if removed > 0 {
            log::info!(
                "Retention sweep: removed {} tasks in {:.3}s",
                removed,
                start.elapsed().as_secs_f64()
            );
        } else {
            log::debug!("Retention sweep: nothing to remove");
        }
    }
}
