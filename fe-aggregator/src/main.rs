use clap::Parser;
use fe_aggregator::{http, AggregatorConfig, AggregatorState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = AggregatorConfig::parse();
    let state = AggregatorState::new(
        config.schema_params_polling_interval(),
        config.decryption_params_polling_interval(),
        config.task_chan_size,
    );
    let app = http::router(state);

    tracing::info!(addr = %config.listen_addr, "aggregator listening");
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
