//! CLI-overridable configuration for the authority binary (spec.md §4.7,
//! SPEC_FULL.md §1.1).

use clap::Parser;
use std::net::SocketAddr;

/// Authority node configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "fe-authority", about = "FE metering protocol authority node")]
pub struct AuthorityConfig {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8081")]
    pub listen_addr: SocketAddr,

    /// Security-level parameter passed to `setupMulti` (spec.md §4.7).
    #[arg(long, default_value_t = fe_core::config::FH_MULTI_IPE_SEC_LEVEL)]
    pub fh_multi_ipe_sec_level: u32,

    /// Inbound task-daemon queue capacity (spec.md §4.1).
    #[arg(long, default_value_t = fe_core::config::SERVER_TASK_DAEMON_CHAN_SIZE)]
    pub task_chan_size: usize,
}
