use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

use vet_clinic_api::app::{self, AppState};
use vet_clinic_api::config::{Config, ServiceKind};
use vet_clinic_api::jobs::{ExpirationAlertJob, JobScheduler, PoolMetricsJob};
use vet_clinic_api::middleware::{self, init_metrics};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    middleware::logging::init_logging(&config.logging);

    if let Err(e) = init_metrics() {
        warn!(error = %e, "Prometheus recorder not installed, /metrics will be empty");
    }

    info!(
        services = ?config.service_set()?.names(),
        "Starting Vet Clinic API v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Create database pool
    let pool = persistence::db::create_pool(&(&config.database).into()).await?;

    // Run migrations
    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    // Build application
    let state = AppState::new(config.clone(), pool.clone())?;

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool, config.database.max_connections));
    if state.services.contains(ServiceKind::Inventory) {
        let settings = &config.inventory;
        scheduler.register(ExpirationAlertJob::new(
            state.alerts.clone(),
            settings.expiration_alert_days,
            settings.alert_hour_utc,
            settings.auto_alerts_enabled,
        ));
    }
    scheduler.start();

    let app = app::router(state);

    // Start server
    let addr = config.socket_addr()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped accepting connections, stopping jobs");
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
