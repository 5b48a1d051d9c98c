//! The FE black box (spec.md §6.1): function-hiding single- and
//! multi-input inner-product encryption, consumed through one tagged sum
//! type (`{None, Single, Multi}`, spec.md §9).
//!
//! This crate is an explicit, documented stand-in (see DESIGN.md): no
//! pairing-based IPFE crate is available in the dependency pack, so the
//! constructions here use additive blinding over `num_bigint::BigInt`
//! rather than a real pairing group. They preserve the inner-product
//! correctness property the rest of the system is tested against, not the
//! security properties of a real scheme.

#![forbid(unsafe_code)]

pub mod error;
pub mod multi;
pub mod none;
pub mod single;
pub mod variant;

pub use error::{Error, Result};
pub use variant::{
    derive_key, encrypt, encryption_params, expected_slots, setup, Cipher, DecryptionParams,
    EncryptionParams, FeDecryptor, MasterSecret, SchemaParams,
};
