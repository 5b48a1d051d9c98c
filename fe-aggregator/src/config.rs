//! CLI-overridable configuration for the aggregator binary (spec.md §4.7).

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Aggregator node configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "fe-aggregator", about = "FE metering protocol aggregator node")]
pub struct AggregatorConfig {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub listen_addr: SocketAddr,

    /// Polling interval against the authority's schema status, in
    /// milliseconds.
    #[arg(long, default_value_t = fe_core::config::SCHEMA_PARAMS_POLLING_INTERVAL.as_millis() as u64)]
    pub schema_params_polling_interval_ms: u64,

    /// Polling interval against the authority's decryption status, in
    /// milliseconds.
    #[arg(long, default_value_t = fe_core::config::DECRYPTION_PARAMS_POLLING_INTERVAL.as_millis() as u64)]
    pub decryption_params_polling_interval_ms: u64,

    /// Inbound task-daemon queue capacity.
    #[arg(long, default_value_t = fe_core::config::SERVER_TASK_DAEMON_CHAN_SIZE)]
    pub task_chan_size: usize,
}

impl AggregatorConfig {
    pub fn schema_params_polling_interval(&self) -> Duration {
        Duration::from_millis(self.schema_params_polling_interval_ms)
    }

    pub fn decryption_params_polling_interval(&self) -> Duration {
        Duration::from_millis(self.decryption_params_polling_interval_ms)
    }
}
