//! Transport-facing error type. Every variant maps cleanly onto
//! `fe_core::ErrorCategory` via `From<Error> for fe_core::Error` so HTTP
//! handlers and remote clients share one taxonomy end to end.

/// Result type for wire-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while encoding, decoding, or transporting protocol
/// messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP client failed to reach the peer or the peer returned a
    /// non-success status.
    #[error("transport error: {0}")]
    Transport(String),

    /// A peer responded with a well-formed but semantically invalid body
    /// (e.g. an `error` status in a status poll).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The binary codec encountered malformed or truncated input.
    #[error("codec error: {0}")]
    Codec(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<Error> for fe_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Transport(msg) => fe_core::Error::Transport(msg),
            Error::Protocol(msg) => fe_core::Error::Protocol(msg),
            Error::Codec(msg) => fe_core::Error::Misuse(format!("malformed wire payload: {msg}")),
            Error::Serialization(err) => fe_core::Error::Serialization(err),
        }
    }
}
