use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use citysearch_core::config::AppConfig;
use citysearch_master::MasterState;
use citysearch_storage::{PgFrontier, Storage};
use tokio::net::TcpListener;
use tracing::info;

/// Runs the master HTTP service (spec §4.6) until interrupted, then drains
/// its in-process reservation buffer back to the frontier on shutdown.
pub async fn run(config: AppConfig) -> Result<()> {
    let storage = Storage::new(&config.database.postgres_url).await?;
    storage.run_migrations().await?;

    let frontier = Arc::new(PgFrontier::new(
        storage.clone(),
        config.frontier.policy,
        config.frontier.batch_size,
    ));

    let state = Arc::new(MasterState::new(
        storage,
        frontier.clone(),
        config.registry.clone(),
        config.relevance.clone(),
        config.master.password.clone(),
        config.master.max_job_request,
        config.master.reserve_buffer_size,
    ));

    spawn_staleness_sweeper(frontier, config.master.stale_after_seconds);

    let app = citysearch_master::router(state.clone());
    let addr = format!("{}:{}", config.master.host, config.master.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "master listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.drain_buffer_and_unreserve().await?;
    info!("master shut down cleanly");
    Ok(())
}

fn spawn_staleness_sweeper(frontier: Arc<PgFrontier>, stale_after_seconds: i64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            match citysearch_frontier::Frontier::sweep_stale(&*frontier, stale_after_seconds).await {
                Ok(0) => {}
                Ok(n) => info!(recovered = n, "swept stale reservations"),
                Err(e) => tracing::error!(error = %e, "staleness sweep failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
