//! Tagged sum type over the three FE variants (spec.md §9 design note):
//! the source uses an empty polymorphic slot any of three concrete types
//! can inhabit; this re-architects it as `{None, Single, Multi}` plus one
//! set of dispatch functions, with variant selection fixed at task-create
//! time and stable for the task's lifetime.

use crate::error::{Error, Result};
use crate::multi::{
    self, MultiDecryptionParams, MultiDecryptor, MultiEncryptionParams, MultiMasterSecret,
    MultiPubKey, MultiSchemaParams,
};
use crate::none::{self, NoneCipher, NoneDecryptionParams, NoneDecryptor, NoneEncryptionParams};
use crate::single::{
    self, SingleDecryptionParams, SingleEncryptionParams, SingleMasterSecret, SingleSchemaParams,
};
use fe_core::task_model::EncryptionMode;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Public schema parameters, one of three variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SchemaParams {
    /// Encryption disabled.
    None,
    /// Single-input schema.
    Single(SingleSchemaParams),
    /// Multi-input schema.
    Multi(MultiSchemaParams),
}

/// Authority-only master secret, one of three variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MasterSecret {
    /// Encryption disabled — no key material.
    None,
    /// Single-input master secret.
    Single(SingleMasterSecret),
    /// Multi-input master secret plus its companion public key.
    Multi(MultiMasterSecret, MultiPubKey),
}

/// Per-sensor encryption params, one of three variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EncryptionParams {
    /// No key material needed.
    None(NoneEncryptionParams),
    /// Single-input encryption params.
    Single(SingleEncryptionParams),
    /// Multi-input encryption params (this sensor's slice of `BHat`).
    Multi(MultiEncryptionParams),
}

/// Decryption params, one of three variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DecryptionParams {
    /// Rate matrix in the clear.
    None(NoneDecryptionParams),
    /// Single-input derived key.
    Single(SingleDecryptionParams),
    /// Multi-input derived key.
    Multi(MultiDecryptionParams),
}

/// A ciphertext, one of three variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cipher {
    /// Plaintext-in-the-clear "ciphertext".
    None(NoneCipher),
    /// Single-input ciphertext.
    Single(single::SingleCipher),
    /// Multi-input ciphertext for one slot.
    Multi(multi::MultiCipher),
}

/// Number of expected ciphertext slots for a task with `sensor_cnt`
/// sensors and `batch_cnt` batches per sensor (spec.md §8: "the number of
/// ciphertexts accepted by the aggregator equals `sensorCnt·batchCnt`").
pub fn expected_slots(mode: EncryptionMode, sensor_cnt: usize, batch_cnt: usize) -> usize {
    match mode {
        EncryptionMode::Single => 1,
        EncryptionMode::Multi | EncryptionMode::None => sensor_cnt * batch_cnt,
    }
}

/// `setup*` dispatch (spec.md §6.1). `vec_len` is `batchSize`.
pub fn setup(
    mode: EncryptionMode,
    sensor_cnt: usize,
    batch_cnt: usize,
    vec_len: usize,
    bound_x: u64,
    bound_y: u64,
    sec_level: u32,
) -> (SchemaParams, MasterSecret) {
    match mode {
        EncryptionMode::None => (SchemaParams::None, MasterSecret::None),
        EncryptionMode::Single => {
            let (schema, master) = single::setup_single(vec_len, bound_x, bound_y);
            (SchemaParams::Single(schema), MasterSecret::Single(master))
        }
        EncryptionMode::Multi => {
            let (schema, master, pub_key) =
                multi::setup_multi(sec_level, sensor_cnt * batch_cnt, vec_len, bound_x, bound_y);
            (SchemaParams::Multi(schema), MasterSecret::Multi(master, pub_key))
        }
    }
}

/// `getEncryptionParams(sensorIdx)` dispatch (spec.md §4.5).
pub fn encryption_params(
    schema: &SchemaParams,
    master: &MasterSecret,
    sensor_idx: usize,
    sensor_cnt: usize,
    batch_cnt: usize,
) -> Result<EncryptionParams> {
    match (schema, master) {
        (SchemaParams::None, MasterSecret::None) => Ok(EncryptionParams::None(NoneEncryptionParams)),
        (SchemaParams::Single(s), MasterSecret::Single(m)) => {
            Ok(EncryptionParams::Single(single::encryption_params_single(s, m, sensor_idx)?))
        }
        (SchemaParams::Multi(s), MasterSecret::Multi(m, _)) => Ok(EncryptionParams::Multi(
            multi::encryption_params_multi(s, m, sensor_idx, sensor_cnt, batch_cnt)?,
        )),
        _ => Err(Error::DimensionMismatch("schema/master variant mismatch".to_string())),
    }
}

/// `encrypt*` dispatch (spec.md §6.1). `local_batch_idx` is the batch
/// index within this sensor's own sequence; `global_idx` is
/// `sensorIdx·batchCnt + batchIdx`, used to tag `none`-mode ciphers.
pub fn encrypt(
    params: &EncryptionParams,
    local_batch_idx: usize,
    global_idx: usize,
    samples: &[u64],
) -> Result<Cipher> {
    match params {
        EncryptionParams::None(_) => Ok(Cipher::None(none::encrypt_none(global_idx, samples))),
        EncryptionParams::Single(p) => Ok(Cipher::Single(single::encrypt_single(p, samples)?)),
        EncryptionParams::Multi(p) => {
            Ok(Cipher::Multi(multi::encrypt_multi(p, local_batch_idx, samples)?))
        }
    }
}

/// `deriveKey*` dispatch (spec.md §4.5). `rate_matrix` has one row per
/// expected slot (single mode has exactly one row).
pub fn derive_key(
    schema: &SchemaParams,
    master: &MasterSecret,
    rate_matrix: &[Vec<u64>],
) -> Result<DecryptionParams> {
    match (schema, master) {
        (SchemaParams::None, MasterSecret::None) => {
            Ok(DecryptionParams::None(none::decryption_params_none(rate_matrix)))
        }
        (SchemaParams::Single(s), MasterSecret::Single(m)) => {
            let rates = rate_matrix
                .first()
                .ok_or_else(|| Error::DimensionMismatch("empty rate matrix for single mode".to_string()))?;
            Ok(DecryptionParams::Single(SingleDecryptionParams {
                schema: s.clone(),
                derived_key: single::derive_key_single(m, rates)?,
            }))
        }
        (SchemaParams::Multi(s), MasterSecret::Multi(m, pub_key)) => {
            Ok(DecryptionParams::Multi(MultiDecryptionParams {
                schema: s.clone(),
                derived_key: multi::derive_key_multi(m, rate_matrix)?,
                pub_key: pub_key.clone(),
            }))
        }
        _ => Err(Error::DimensionMismatch("schema/master variant mismatch".to_string())),
    }
}

/// Stateful cipher-accumulating decryptor, dispatched by variant
/// (spec.md §4.4 "Cipher accumulation").
pub enum FeDecryptor {
    /// Dummy (plaintext) accumulation.
    None(NoneDecryptor),
    /// Single-input: terminal on first cipher.
    Single {
        /// The derived key awaiting a cipher.
        params: SingleDecryptionParams,
        /// Cached result once the single cipher has arrived.
        result: Option<BigInt>,
    },
    /// Multi-input: stateful partial decryption keyed by slot index.
    Multi(MultiDecryptor),
}

impl FeDecryptor {
    /// Build a decryptor over `params`, expecting `expected_slots` distinct
    /// cipher indices (ignored for `Single`, which always expects exactly
    /// one cipher with no index).
    pub fn new(params: DecryptionParams, expected_slots: usize) -> Self {
        match params {
            DecryptionParams::None(p) => FeDecryptor::None(NoneDecryptor::new(p)),
            DecryptionParams::Single(p) => FeDecryptor::Single { params: p, result: None },
            DecryptionParams::Multi(p) => FeDecryptor::Multi(MultiDecryptor::new(p, expected_slots)),
        }
    }

    /// Fold in one ciphertext. Returns `Some(scalar)` exactly once — on
    /// whichever call makes the decryptor terminal — and `None` on every
    /// other call, including duplicate resubmissions once terminal.
    pub fn add_cipher(&mut self, cipher: Cipher) -> Result<Option<BigInt>> {
        match (self, cipher) {
            (FeDecryptor::None(d), Cipher::None(c)) => {
                d.add_cipher(c)?;
                if d.remaining_slots() == 0 { Ok(Some(d.finalize()?)) } else { Ok(None) }
            }
            (FeDecryptor::Single { params, result }, Cipher::Single(c)) => {
                if result.is_some() {
                    return Ok(None);
                }
                let scalar = single::decrypt_single(&c, &params.derived_key)?;
                *result = Some(scalar.clone());
                Ok(Some(scalar))
            }
            (FeDecryptor::Multi(d), Cipher::Multi(c)) => {
                d.add_cipher(c)?;
                if d.remaining_slots() == 0 { Ok(Some(d.finalize()?)) } else { Ok(None) }
            }
            _ => Err(Error::DimensionMismatch(
                "cipher variant does not match decryptor variant".to_string(),
            )),
        }
    }

    /// Number of slots still outstanding (`Single` reports 0 or 1).
    pub fn remaining_slots(&self) -> usize {
        match self {
            FeDecryptor::None(d) => d.remaining_slots(),
            FeDecryptor::Single { result, .. } => if result.is_some() { 0 } else { 1 },
            FeDecryptor::Multi(d) => d.remaining_slots(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_single_mode() {
        let mode = EncryptionMode::Single;
        let (schema, master) = setup(mode, 1, 1, 4, 10, 5, 1);
        let enc_params = encryption_params(&schema, &master, 0, 1, 1).unwrap();
        let cipher = encrypt(&enc_params, 0, 0, &[3, 1, 4, 1]).unwrap();
        let dec_params = derive_key(&schema, &master, &[vec![2, 0, 3, 5]]).unwrap();
        let mut decryptor = FeDecryptor::new(dec_params, expected_slots(mode, 1, 1));
        let result = decryptor.add_cipher(cipher).unwrap();
        assert_eq!(result, Some(BigInt::from(23)));
    }

    #[test]
    fn end_to_end_none_mode_uses_multiplication() {
        let mode = EncryptionMode::None;
        let sensor_cnt = 2;
        let batch_cnt = 2;
        let (schema, master) = setup(mode, sensor_cnt, batch_cnt, 2, 10, 5, 1);
        let rate_matrix = vec![vec![1u64, 1]; sensor_cnt * batch_cnt];
        let dec_params = derive_key(&schema, &master, &rate_matrix).unwrap();
        let mut decryptor = FeDecryptor::new(dec_params, expected_slots(mode, sensor_cnt, batch_cnt));

        let samples = [[1u64, 2], [3, 4], [5, 6], [7, 8]];
        let mut last = None;
        for (idx, s) in samples.iter().enumerate() {
            let enc_params = encryption_params(&schema, &master, 0, 1, 1).unwrap();
            let cipher = encrypt(&enc_params, 0, idx, s).unwrap();
            last = decryptor.add_cipher(cipher).unwrap();
        }
        assert_eq!(last, Some(BigInt::from(36)));
    }
}
