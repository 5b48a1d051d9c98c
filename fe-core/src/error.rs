//! Error taxonomy shared by every node in the metering protocol.
//!
//! Every fallible operation in this workspace that crosses a node boundary
//! (HTTP handler, remote client call, task worker) should fail with this
//! `Error` type or wrap it, so the taxonomy in the design doc maps onto a
//! single classifier instead of being re-derived per crate.

/// Result type used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the metering protocol's core logic.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport failure or non-success status from a peer node.
    #[error("transport error: {0}")]
    Transport(String),

    /// A peer reported a protocol-level `error` or `invalid` status.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The FE scheme (setup/encrypt/derive/decrypt) returned an error.
    #[error("FE operation failed: {0}")]
    FeFailure(String),

    /// A bounded queue rejected new work because it is full.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// Caller-supplied input was invalid (bad UUID, length mismatch, unknown id).
    #[error("invalid request: {0}")]
    Misuse(String),

    /// Something unexpected occurred that is not user-facing.
    #[error("internal error: {0}")]
    Internal(String),

    /// Task, sensor, tariff, or customer id not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Classify the error for logging, metrics, and HTTP status mapping.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Transport(_) => ErrorCategory::Transport,
            Error::Protocol(_) => ErrorCategory::Protocol,
            Error::FeFailure(_) => ErrorCategory::FeFailure,
            Error::Capacity(_) => ErrorCategory::Capacity,
            Error::Misuse(_) => ErrorCategory::Misuse,
            Error::NotFound(_) => ErrorCategory::Misuse,
            Error::Internal(_) | Error::Serialization(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this error stems from caller misuse rather than an internal fault.
    pub fn is_user_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Misuse | ErrorCategory::Capacity)
    }

    /// Default HTTP status for this error (spec.md §7): `NotFound` maps to
    /// `404` specifically even though it shares `Misuse`'s category for
    /// logging purposes; every HTTP-facing crate's `IntoResponse` impl
    /// starts from this and overrides only the handful of endpoint-specific
    /// codes spec.md calls out by name (e.g. `409` on a conflicting
    /// `POST /authority`).
    pub fn default_http_status(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::Misuse(_) => 400,
            Error::Capacity(_) => 503,
            Error::Transport(_) | Error::Protocol(_) => 502,
            Error::FeFailure(_) | Error::Internal(_) | Error::Serialization(_) => 500,
        }
    }

    /// Shorthand constructor for a misuse error with a formatted message.
    pub fn misuse(msg: impl Into<String>) -> Self {
        Error::Misuse(msg.into())
    }

    /// Shorthand constructor for a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}

/// Error categories, used for HTTP status mapping and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Peer unreachable or returned a non-success HTTP status.
    Transport,
    /// Peer reported an application-level error/invalid status.
    Protocol,
    /// The FE black box failed.
    FeFailure,
    /// A bounded resource (queue, semaphore) is exhausted.
    Capacity,
    /// Caller supplied invalid input.
    Misuse,
    /// Internal/unclassified fault.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Transport => write!(f, "Transport"),
            ErrorCategory::Protocol => write!(f, "Protocol"),
            ErrorCategory::FeFailure => write!(f, "FeFailure"),
            ErrorCategory::Capacity => write!(f, "Capacity"),
            ErrorCategory::Misuse => write!(f, "Misuse"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transport_errors() {
        let err = Error::Transport("connection refused".into());
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert!(!err.is_user_error());
    }

    #[test]
    fn classifies_misuse_as_user_error() {
        let err = Error::misuse("unknown tariff id");
        assert_eq!(err.category(), ErrorCategory::Misuse);
        assert!(err.is_user_error());
    }

    #[test]
    fn not_found_is_misuse_category() {
        let err = Error::not_found("task not found");
        assert_eq!(err.category(), ErrorCategory::Misuse);
    }

    #[test]
    fn category_display() {
        assert_eq!(ErrorCategory::FeFailure.to_string(), "FeFailure");
        assert_eq!(ErrorCategory::Capacity.to_string(), "Capacity");
    }
}
