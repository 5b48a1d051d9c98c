//! Errors raised by the FE black box (spec.md §6.1, §7 "FE failure").

/// Result type for FE scheme operations.
pub type Result<T> = std::result::Result<T, Error>;

/// FE scheme errors. These always map onto `fe_core::Error::FeFailure` at
/// the node layer; kept distinct here so the scheme crate has no
/// dependency on node-level error classification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A vector/matrix had the wrong dimensions for the schema it was used
    /// against.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// `sensorIdx` was out of range for the schema's sensor count.
    #[error("sensor index {sensor_idx} out of range (sensor_cnt={sensor_cnt})")]
    SensorIdxOutOfRange {
        /// Requested index.
        sensor_idx: usize,
        /// Number of sensors the schema was set up for.
        sensor_cnt: usize,
    },

    /// A cipher for an index outside the expected range was presented to a
    /// decryptor.
    #[error("cipher index {idx} out of range (expected < {expected})")]
    CipherIdxOutOfRange {
        /// Index on the offending cipher.
        idx: usize,
        /// Number of slots the decryptor expects.
        expected: usize,
    },

    /// `finalize` was called before every expected cipher arrived.
    #[error("decryption requested before all ciphers arrived ({remaining} remaining)")]
    IncompleteDecryption {
        /// Number of slots still missing.
        remaining: usize,
    },
}
