use anyhow::Result;
use household_tariff::{api, app::AppState, config::Config, ingestion, telemetry};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing()?;

    let cfg = Config::load()?;
    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!("binding to 0.0.0.0, the pricing endpoint is reachable from the network");
    }

    let state = AppState::new(cfg).await?;
    ingestion::spawn_ingestion_tasks(state.clone())?;

    let app = api::router(state);

    info!(%addr, "starting household tariff service");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
