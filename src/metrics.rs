//! Prometheus metrics for task and session observability.
//!
//! Exposed on `/metrics` next to the HTTP metrics of `actix-web-prometheus`,
//! which shares [`REGISTRY`].

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::LazyLock;

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Task Counters
// ============================================================================

/// Total number of tasks created
pub static TASKS_CREATED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("tasks_created_total", "Total number of tasks created"),
        &["kind"],
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Total number of tasks by status transition
pub static TASK_STATUS_TRANSITIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "task_status_transitions_total",
            "Number of task status transitions",
        ),
        &["from_status", "to_status"],
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Tasks finished by outcome (completed/failed)
pub static TASKS_COMPLETED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("tasks_completed_total", "Total number of tasks finished"),
        &["outcome", "kind"],
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static TASKS_CANCELLED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new("tasks_cancelled_total", "Total number of tasks cancelled")
        .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static TASKS_TIMED_OUT_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "tasks_timed_out_total",
        "Total number of tasks that timed out",
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Tasks failed because every slot was taken
pub static TASKS_REJECTED_BY_CAPACITY: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "tasks_rejected_by_capacity_total",
        "Total number of tasks failed because the concurrency cap was reached",
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Tasks refused because the background queue was full
pub static TASKS_REJECTED_BY_QUEUE: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "tasks_rejected_by_queue_total",
        "Total number of tasks refused because the work queue was full",
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

// ============================================================================
// Gauges
// ============================================================================

pub static RUNNING_TASKS: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new("running_tasks", "Current number of running tasks")
        .expect("metric can be created");
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

pub static QUEUED_TASKS: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new("queued_tasks", "Tasks waiting in the work queue")
        .expect("metric can be created");
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Duration Metrics
// ============================================================================

/// Task execution duration (from Running to completion)
pub static TASK_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "task_duration_seconds",
            "Task execution duration in seconds from Running to completion",
        )
        .buckets(vec![1.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 180.0, 300.0]),
        &["kind", "outcome"],
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(histogram.clone())).unwrap();
    histogram
});

/// Task wait time (from Pending to Running)
pub static TASK_WAIT_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "task_wait_seconds",
            "Task wait time in seconds from Pending to Running",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(histogram.clone())).unwrap();
    histogram
});

// ============================================================================
// Retention
// ============================================================================

pub static SWEEP_RUNS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new("task_sweep_runs_total", "Number of retention sweeps")
        .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static SWEPT_TASKS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "tasks_swept_total",
        "Total number of finished tasks removed by retention sweeps",
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

// ============================================================================
// Sessions & downloads
// ============================================================================

/// Session resolutions by winning source
pub static SESSION_RESOLUTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "session_resolutions_total",
            "Storage state resolutions by source",
        ),
        &["source"],
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static BREAKER_STATE_TRANSITIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "credentials_breaker_transitions_total",
            "Credentials service breaker state transitions",
        ),
        &["to_state"],
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static ARCHIVE_DOWNLOAD_BYTES: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "archive_download_bytes_total",
        "Bytes downloaded for upload tasks",
    )
    .expect("metric can be created");
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

// ============================================================================
// Helpers
// ============================================================================

pub fn record_task_created(kind: &str) {
    TASKS_CREATED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_status_transition(from: &str, to: &str) {
    TASK_STATUS_TRANSITIONS.with_label_values(&[from, to]).inc();
}

pub fn record_task_completed(outcome: &str, kind: &str) {
    TASKS_COMPLETED_TOTAL
        .with_label_values(&[outcome, kind])
        .inc();
}

pub fn record_task_cancelled() {
    TASKS_CANCELLED_TOTAL.inc();
}

pub fn record_task_timeout() {
    TASKS_TIMED_OUT_TOTAL.inc();
}

pub fn record_capacity_rejection() {
    TASKS_REJECTED_BY_CAPACITY.inc();
}

pub fn record_queue_rejection() {
    TASKS_REJECTED_BY_QUEUE.inc();
}

pub fn set_running_tasks(count: usize) {
    RUNNING_TASKS.set(count as i64);
}

pub fn set_queued_tasks(count: usize) {
    QUEUED_TASKS.set(count as i64);
}

pub fn record_task_duration(kind: &str, outcome: &str, duration_secs: f64) {
    TASK_DURATION_SECONDS
        .with_label_values(&[kind, outcome])
        .observe(duration_secs);
}

pub fn record_task_wait(kind: &str, wait_secs: f64) {
    TASK_WAIT_SECONDS
        .with_label_values(&[kind])
        .observe(wait_secs);
}

pub fn record_sweep(removed: usize) {
    SWEEP_RUNS.inc();
    SWEPT_TASKS.inc_by(removed as u64);
}

pub fn record_session_resolution(source: &str) {
    SESSION_RESOLUTIONS.with_label_values(&[source]).inc();
}

pub fn record_breaker_state(to_state: &str) {
    BREAKER_STATE_TRANSITIONS
        .with_label_values(&[to_state])
        .inc();
}

pub fn record_download_bytes(bytes: u64) {
    ARCHIVE_DOWNLOAD_BYTES.inc_by(bytes);
}

/// Register every metric so they show up on `/metrics` before first use.
pub fn init_metrics() {
    let _ = &*TASKS_CREATED_TOTAL;
    let _ = &*TASK_STATUS_TRANSITIONS;
    let _ = &*TASKS_COMPLETED_TOTAL;
    let _ = &*TASKS_CANCELLED_TOTAL;
    let _ = &*TASKS_TIMED_OUT_TOTAL;
    let _ = &*TASKS_REJECTED_BY_CAPACITY;
    let _ = &*TASKS_REJECTED_BY_QUEUE;
    let _ = &*RUNNING_TASKS;
    let _ = &*QUEUED_TASKS;
    let _ = &*TASK_DURATION_SECONDS;
    let _ = &*TASK_WAIT_SECONDS;
    let _ = &*SWEEP_RUNS;
    let _ = &*SWEPT_TASKS;
    let _ = &*SESSION_RESOLUTIONS;
    let _ = &*BREAKER_STATE_TRANSITIONS;
    let _ = &*ARCHIVE_DOWNLOAD_BYTES;
}
