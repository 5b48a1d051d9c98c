//! Single-input function-hiding inner-product FE (spec.md §6.1
//! `setupSingle`/`encryptSingle`/`deriveKeySingle`/`decryptSingle`).
//!
//! Stand-in construction (documented as a deviation in DESIGN.md — this
//! crate has no real pairing-based FE available in the dependency pack):
//! the master secret is a random blinding vector `b`. Encryption adds the
//! blind componentwise; the derived key carries the rate vector plus the
//! precomputed correction term `Σ b_i·y_i` needed to cancel the blind at
//! decrypt time. This preserves the one property the rest of the system
//! depends on — `decrypt(encrypt(x), deriveKey(y)) == Σ x_i·y_i` — without
//! claiming any cryptographic hardness.

use crate::error::{Error, Result};
use num_bigint::BigInt;
use num_traits::Zero;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Public schema parameters for single-input FE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleSchemaParams {
    /// Length of the plaintext/rate vectors.
    pub vec_len: usize,
    /// Upper bound on sample (ciphertext input) values.
    pub bound_x: u64,
    /// Upper bound on rate (key input) values.
    pub bound_y: u64,
}

/// Master secret produced by `setup_single`; never leaves the authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleMasterSecret {
    mask: Vec<BigInt>,
}

/// Per-sensor encryption params (single-input FE has exactly one sensor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleEncryptionParams {
    /// Schema this key material was generated under.
    pub schema: SingleSchemaParams,
    mask: Vec<BigInt>,
}

/// A single-input ciphertext: one blinded vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleCipher(pub Vec<BigInt>);

/// Derived decryption key for single-input FE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleDerivedKey {
    rates: Vec<BigInt>,
    correction: BigInt,
}

/// Decryption params: schema plus derived key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleDecryptionParams {
    /// Schema this key was derived under.
    pub schema: SingleSchemaParams,
    /// Derived key.
    pub derived_key: SingleDerivedKey,
}

/// `setupSingle(vecLen, boundX, boundY) -> (schemaParams, masterSecret)`.
pub fn setup_single(vec_len: usize, bound_x: u64, bound_y: u64) -> (SingleSchemaParams, SingleMasterSecret) {
    let mut rng = rand::thread_rng();
    let mask: Vec<BigInt> = (0..vec_len)
        .map(|_| BigInt::from(rng.gen_range(0..=bound_x.max(1))))
        .collect();
    (SingleSchemaParams { vec_len, bound_x, bound_y }, SingleMasterSecret { mask })
}

/// Derive this sensor's encryption params. Single-input FE has exactly
/// one sensor, so `sensor_idx` must be `0`.
pub fn encryption_params_single(
    schema: &SingleSchemaParams,
    master: &SingleMasterSecret,
    sensor_idx: usize,
) -> Result<SingleEncryptionParams> {
    if sensor_idx != 0 {
        return Err(Error::SensorIdxOutOfRange { sensor_idx, sensor_cnt: 1 });
    }
    Ok(SingleEncryptionParams { schema: schema.clone(), mask: master.mask.clone() })
}

/// `encryptSingle(samples, masterSecret) -> cipher`.
pub fn encrypt_single(params: &SingleEncryptionParams, samples: &[u64]) -> Result<SingleCipher> {
    if samples.len() != params.mask.len() {
        return Err(Error::DimensionMismatch(format!(
            "expected {} samples, got {}",
            params.mask.len(),
            samples.len()
        )));
    }
    let cipher = samples
        .iter()
        .zip(params.mask.iter())
        .map(|(x, b)| BigInt::from(*x) + b)
        .collect();
    Ok(SingleCipher(cipher))
}

/// `deriveKeySingle(rates, masterSecret) -> derivedKey`.
pub fn derive_key_single(master: &SingleMasterSecret, rates: &[u64]) -> Result<SingleDerivedKey> {
    if rates.len() != master.mask.len() {
        return Err(Error::DimensionMismatch(format!(
            "expected {} rates, got {}",
            master.mask.len(),
            rates.len()
        )));
    }
    let rates: Vec<BigInt> = rates.iter().map(|r| BigInt::from(*r)).collect();
    let correction = master
        .mask
        .iter()
        .zip(rates.iter())
        .fold(BigInt::zero(), |acc, (b, y)| acc + b * y);
    Ok(SingleDerivedKey { rates, correction })
}

/// `decryptSingle(cipher, derivedKey) -> scalar`.
pub fn decrypt_single(cipher: &SingleCipher, key: &SingleDerivedKey) -> Result<BigInt> {
    if cipher.0.len() != key.rates.len() {
        return Err(Error::DimensionMismatch(format!(
            "cipher length {} does not match key length {}",
            cipher.0.len(),
            key.rates.len()
        )));
    }
    let raw = cipher
        .0
        .iter()
        .zip(key.rates.iter())
        .fold(BigInt::zero(), |acc, (c, y)| acc + c * y);
    Ok(raw - &key.correction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_product_survives_blinding() {
        let (schema, master) = setup_single(4, 10, 5);
        let enc_params = encryption_params_single(&schema, &master, 0).unwrap();
        let samples = [3u64, 1, 4, 1];
        let cipher = encrypt_single(&enc_params, &samples).unwrap();
        let rates = [2u64, 0, 3, 5];
        let key = derive_key_single(&master, &rates).unwrap();
        let result = decrypt_single(&cipher, &key).unwrap();
        assert_eq!(result, BigInt::from(23));
    }

    #[test]
    fn rejects_wrong_sensor_idx() {
        let (schema, master) = setup_single(2, 10, 10);
        assert!(encryption_params_single(&schema, &master, 1).is_err());
    }

    #[test]
    fn rejects_mismatched_sample_length() {
        let (_schema, master) = setup_single(4, 10, 10);
        let enc_params = SingleEncryptionParams { schema: _schema, mask: master.mask.clone() };
        assert!(encrypt_single(&enc_params, &[1, 2]).is_err());
    }
}
