//! Status enums observed across the HTTP polling boundary (spec.md §4.4,
//! §4.5, §7): `created` retries, `ready` proceeds, `error`/`invalid` are
//! protocol failures handled differently depending on which poll it is.

use serde::{Deserialize, Serialize};

/// Status of FE schema-params generation on the authority (spec.md §4.5).
/// The authority's `create` worker drives this `created -> ready | error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaStatus {
    /// Setup has not completed yet; poller should retry.
    Created,
    /// Schema and encryption params are ready to be fetched.
    Ready,
    /// FE setup failed; terminal.
    Error,
}

/// Status of a decryption-params job on the authority (spec.md §4.5,
/// data model's `DecryptionJob`). Unlike `SchemaStatus`, this includes
/// `invalid`, which triggers rate regeneration rather than a terminal
/// failure (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecryptionStatus {
    /// Key derivation has not completed yet; poller should retry.
    Created,
    /// Decryption params are ready to be fetched.
    Ready,
    /// The submitted rate vector was rejected; caller should regenerate
    /// and resubmit rates rather than treat this as terminal.
    Invalid,
    /// Key derivation failed; terminal.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_status_round_trips_json() {
        let s = SchemaStatus::Ready;
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"ready\"");
        let back: SchemaStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SchemaStatus::Ready);
    }

    #[test]
    fn decryption_status_has_invalid_variant() {
        let s = DecryptionStatus::Invalid;
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"invalid\"");
    }
}
