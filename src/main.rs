use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sharpedge_store::api::health::HealthState;
use sharpedge_store::api::{router, ApiState};
use sharpedge_store::config::Config;
use sharpedge_store::db::{self, retention::RetentionSweeper, Store};
use sharpedge_store::error::Result;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg).await?;
    let store = Store::new(pool);

    for count in store.table_counts().await? {
        info!(table = %count.table, rows = count.rows, "table ready");
    }

    let health = Arc::new(HealthState::new());

    // --- Retention sweeper (background) ---
    match cfg.retention_ms() {
        Some(retention_ms) => {
            let sweeper = RetentionSweeper::new(
                store.clone(),
                Arc::clone(&health),
                retention_ms,
                Duration::from_secs(cfg.cleanup_interval_secs),
            );
            tokio::spawn(async move { sweeper.run().await });
            info!(
                "Retention: keeping {} days of odds/ev rows, sweeping every {}s",
                cfg.retention_days, cfg.cleanup_interval_secs
            );
        }
        None => warn!("RETENTION_DAYS=0: odds and ev logs will grow without bound"),
    }

    // --- HTTP API server ---
    let app = router(ApiState { store, health });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
