//! Authority node (spec.md §4.5): holds the FE master secret for every
//! task it has been asked to provision, answers per-sensor encryption
//! params once schema setup completes, and derives decryption keys on
//! request from the aggregator's rate submissions.
//!
//! Stateless across tasks in the sense that nothing survives a restart
//! (spec.md §6.3) — but very much stateful *within* a process run, which
//! is why this crate, unlike `fe-wire`, owns a `DashMap`-backed registry.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod http;
pub mod state;
pub mod task;

pub use config::AuthorityConfig;
pub use state::AuthorityState;
