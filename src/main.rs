//! Feed harvester service: scheduled harvesting plus the HTTP control surface.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use feed_harvester::api::{self, AppState};
use feed_harvester::config::HarvesterConfig;
use feed_harvester::harvest::scheduler::Scheduler;
use feed_harvester::harvest::stats::StatsReporter;
use feed_harvester::logging::init_tracing;
use feed_harvester::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();
    info!("feed harvester initializing");

    let config = HarvesterConfig::from_env().context("reading configuration")?;
    info!(
        interval_secs = config.harvest_interval.as_secs(),
        allowed = ?config.allowed_statuses,
        backend = ?config.store_backend,
        "configuration loaded"
    );

    let metrics = Metrics::init()?;
    let harvester = feed_harvester::build_harvester(&config).await?;

    let scheduler = Arc::new(Scheduler::new(harvester.clone()));
    let ticker = scheduler.start(config.harvest_interval);

    let state = AppState {
        scheduler: scheduler.clone(),
        stats: StatsReporter::new(harvester, config.harvest_interval),
        service_name: Arc::from(config.service_name.as_str()),
    };
    let app = api::router(state).merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "feed harvester listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    info!("shutting down: waiting for in-flight cycles");
    if scheduler.shutdown_and_join(ticker).await {
        info!("shutdown complete");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
