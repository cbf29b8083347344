//! OCPP mediating proxy entry point: loads configuration, opens the
//! database, wires the session mediator to the charger-facing WebSocket
//! acceptor and the operator-facing control surface, and serves both off
//! one listener until a shutdown signal arrives.

use std::sync::Arc;

use tracing::{error, info};

use ocpp_proxy::config::{AppConfig, ConfigStore};
use ocpp_proxy::domain::PersistenceProvider;
use ocpp_proxy::infrastructure::database::connect_and_migrate;
use ocpp_proxy::infrastructure::SeaOrmPersistence;
use ocpp_proxy::session::log_queue::{run_log_worker, LogQueue};
use ocpp_proxy::session::Mediator;
use ocpp_proxy::support::shutdown::{listen_for_shutdown_signals, ShutdownSignal};
use ocpp_proxy::{control, ws};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app_config = match AppConfig::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!(error = %e, "failed to load configuration, using defaults");
            AppConfig::default()
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&app_config.log_level)),
        )
        .init();

    info!("starting OCPP mediating proxy");

    let db = connect_and_migrate(&app_config.database_url).await?;
    let persistence: Arc<SeaOrmPersistence> = Arc::new(SeaOrmPersistence::new(db));

    let seeded_config = persistence.seed_config(&app_config.proxy).await?;
    let config_store = Arc::new(ConfigStore::new(seeded_config));

    let log_queue = Arc::new(LogQueue::new(config_store.load().log_queue_capacity));

    let shutdown = ShutdownSignal::new();
    tokio::spawn(listen_for_shutdown_signals(shutdown.clone()));

    let log_worker_shutdown = shutdown.clone();
    let log_worker_queue = log_queue.clone();
    let log_worker_persistence = persistence.clone();
    tokio::spawn(async move {
        run_log_worker(log_worker_queue, log_worker_persistence, log_worker_shutdown).await;
    });

    let mediator = Mediator::new(config_store, persistence, log_queue);

    let app = ws::router(mediator.clone()).merge(control::router(mediator));

    let listener = tokio::net::TcpListener::bind(&app_config.listen_addr).await?;
    info!(addr = %app_config.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.wait().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
