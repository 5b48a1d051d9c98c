//! Aggregator node (spec.md §4.4): the customer/sensor/tariff registries,
//! the authority address book, and the per-task orchestration that drives
//! schema setup, sensor fan-out, rate submission, and cipher accumulation
//! through to a final result.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod http;
pub mod registry;
pub mod state;
pub mod task;

pub use config::AggregatorConfig;
pub use state::AggregatorState;
