use actix_web::{HttpResponse, web};

use super::{AppState, HealthResponse};

#[utoipa::path(
    get,
    path = "/",
    summary = "Service information",
    responses((status = 200, description = "Name, version and useful links")),
    tag = "service"
)]
/// Service name, version and entry points
pub async fn service_info() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/api-docs/openapi.json",
        "health": "/health",
        "metrics": "/metrics",
    }))
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "Health check",
    description = "Always 200 while the process serves requests. `status` is `degraded` when the browser driver does not answer its health probe.",
    responses(
        (status = 200, description = "Service status", body = HealthResponse),
    ),
    tag = "service"
)]
/// Health check endpoint - probes the browser driver
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let driver_ready = state.driver.is_ready().await;
    if !driver_ready {
        log::warn!("Health check: browser driver not ready");
    }

    HttpResponse::Ok().json(HealthResponse {
        status: if driver_ready { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        driver_ready,
        uptime_seconds: state.started_at.elapsed().as_secs_f64(),
        running_tasks: state.manager.running_count(),
        max_concurrent_tasks: state.manager.max_concurrent(),
        queued_tasks: state.queue.len(),
        tracked_tasks: state.manager.store().len(),
        tasks_by_status: state.manager.store().count_by_status(),
    })
}
