use clap::Parser;
use fe_sensor::{http, SensorConfig, SensorState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = SensorConfig::parse();
    let state = SensorState::new(
        config.advertise_ip,
        config.encryption_params_polling_interval(),
        config.task_chan_size,
    );
    let app = http::router(state);

    tracing::info!(addr = %config.listen_addr, "sensor listening");
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
