//! Interface actions server.
//!
//! Accepts chat messages and archive uploads over HTTP and runs them as
//! tasks against the browser driver sidecar.

use std::sync::Arc;
use std::time::Instant;

use actix_web::{App, HttpServer, middleware, web};
use actix_web_prometheus::PrometheusMetricsBuilder;
use interface_actions::{
    config::Config,
    download::ArchiveDownloader,
    driver::{ChatDriver, RemoteDriver},
    handlers::{AppState, configure_routes},
    metrics,
    runner::{PlatformExecutor, TaskManager},
    session::SessionResolver,
    telemetry,
    workers::{self, WorkQueue},
};
use tokio::sync::watch;

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;
    telemetry::init_logging(&config.observability);

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| startup_error("rustls", "failed to install crypto provider"))?;

    metrics::init_metrics();

    log::info!(
        "Platform {} at {}, driver at {}",
        config.platform.name,
        config.platform.base_url,
        config.driver.url
    );
    if config.credentials_enabled() {
        log::info!("Credentials service enabled");
    } else {
        log::info!("Credentials service not configured, using environment and local session");
    }

    let sessions = Arc::new(
        SessionResolver::from_config(&config)
            .map_err(|e| startup_error("Failed to set up sessions", e))?,
    );
    let driver: Arc<dyn ChatDriver> = Arc::new(
        RemoteDriver::new(&config.driver, &config.platform)
            .map_err(|e| startup_error("Failed to build driver client", e))?,
    );
    let downloader = ArchiveDownloader::new(&config.download)
        .map_err(|e| startup_error("Failed to build download client", e))?;

    let executor = Arc::new(PlatformExecutor::new(
        driver.clone(),
        sessions.clone(),
        downloader,
        config.platform.clone(),
        config.credentials.user_identifier.clone(),
    ));
    let manager = TaskManager::new(config.worker.max_concurrent_tasks, executor);
    log::info!(
        "Task manager ready (max {} concurrent tasks)",
        manager.max_concurrent()
    );

    let (queue, receiver) = WorkQueue::new(config.worker.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dispatcher = actix_web::rt::spawn(workers::dispatch_loop(
        manager.clone(),
        receiver,
        shutdown_rx.clone(),
    ));
    let sweeper = actix_web::rt::spawn(workers::retention_sweep_loop(
        manager.clone(),
        config.worker.clone(),
        shutdown_rx,
    ));

    let prometheus = PrometheusMetricsBuilder::new("api")
        .registry(metrics::REGISTRY.clone())
        .endpoint("/metrics")
        .build()
        .map_err(|e| startup_error("Failed to build metrics middleware", e))?;

    let bind = (config.host.clone(), config.port);
    let config = Arc::new(config);
    let state = AppState {
        manager: manager.clone(),
        queue,
        sessions: sessions.clone(),
        driver,
        config,
        started_at: Instant::now(),
    };

    log::info!("starting HTTP server at http://{}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(prometheus.clone())
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(bind)?
    .run()
    .await?;

    log::info!("HTTP server stopped, shutting down workers");
    if shutdown_tx.send(true).is_err() {
        log::debug!("Workers already stopped");
    }
    let _ = tokio::join!(dispatcher, sweeper);

    match sessions.persist_latest().await {
        Ok(true) => log::info!("Session snapshot saved"),
        Ok(false) => log::debug!("No session to save"),
        Err(e) => log::error!("Failed to save session snapshot: {}", e),
    }
    log::info!("Shutdown complete");
    Ok(())
}
