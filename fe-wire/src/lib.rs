//! HTTP wire plumbing shared by every node (spec.md §6.2): JSON request/
//! response DTOs, the self-describing binary codec for FE structures, and
//! a thin `reqwest`-based remote client with transport-level retry.
//!
//! This crate has no task-pipeline logic of its own — every node's HTTP
//! handlers and remote-client calls are built on top of it.

#![forbid(unsafe_code)]

pub mod client;
pub mod codec;
pub mod dto;
pub mod error;

pub use client::{RemoteClient, RetryConfig};
pub use error::{Error, Result};
