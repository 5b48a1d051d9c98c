//! Domain types shared by the authority, aggregator, and sensor nodes of
//! the privacy-preserving metering protocol: task identifiers, the
//! immutable task data model, status enums observed over HTTP polling, the
//! error taxonomy, configuration defaults, the repeated sequence generator,
//! and the aggregator's trivial registries.
//!
//! This crate has no networking and no FE scheme logic of its own — it is
//! the vocabulary every other crate in the workspace shares.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod ids;
pub mod rate_gen;
pub mod registry;
pub mod status;
pub mod task_model;

pub use error::{Error, ErrorCategory, Result};
pub use ids::{CustomerId, DecryptionParamsId, SensorId, TariffId, TaskId};
pub use task_model::{BatchParams, EncryptionMode, SamplingParams, TaskSpec};
