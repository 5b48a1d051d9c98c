use clap::Parser;
use fe_authority::{http, AuthorityConfig, AuthorityState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = AuthorityConfig::parse();
    let state = AuthorityState::new(config.fh_multi_ipe_sec_level, config.task_chan_size);
    let app = http::router(state);

    tracing::info!(addr = %config.listen_addr, "authority listening");
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
