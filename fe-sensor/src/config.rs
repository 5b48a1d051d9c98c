//! CLI-overridable configuration for the sensor binary (spec.md §4.7).

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Sensor node configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "fe-sensor", about = "FE metering protocol sensor node")]
pub struct SensorConfig {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8090")]
    pub listen_addr: SocketAddr,

    /// Address this sensor advertises to the aggregator on `GET /register`
    /// (spec.md §4.3.2); `listen_addr` is often `0.0.0.0` and not reachable
    /// as-is, so this is configured separately.
    #[arg(long, default_value = "127.0.0.1")]
    pub advertise_ip: IpAddr,

    /// Polling interval against the authority's encryption params, in
    /// milliseconds.
    #[arg(long, default_value_t = fe_core::config::ENCRYPTION_PARAMS_POLLING_INTERVAL.as_millis() as u64)]
    pub encryption_params_polling_interval_ms: u64,

    /// Submission semaphore capacity (spec.md §4.3).
    #[arg(long, default_value_t = fe_core::config::SENSOR_MAX_PARALLEL_SUBMIT_BATCHES)]
    pub max_parallel_submit_batches: usize,

    /// Inbound task-daemon queue capacity (spec.md §4.1).
    #[arg(long, default_value_t = fe_core::config::SENSOR_TASK_CHAN_SIZE)]
    pub task_chan_size: usize,
}

impl SensorConfig {
    pub fn encryption_params_polling_interval(&self) -> Duration {
        Duration::from_millis(self.encryption_params_polling_interval_ms)
    }
}
