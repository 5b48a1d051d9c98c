//! Error alias for this crate — `fe-runtime`'s primitives are generic
//! plumbing and raise the same taxonomy as the rest of the workspace
//! rather than inventing their own.

pub use fe_core::error::{Error, Result};
