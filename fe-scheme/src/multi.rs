//! Multi-input function-hiding inner-product FE (spec.md §6.1
//! `setupMulti`/`encryptMulti`/`deriveKeyMulti`/`decryptMulti`).
//!
//! Stand-in construction, same shape as `single`: one blinding vector per
//! slot (`BHat[slot]`), a derived key carrying the rate matrix plus the
//! correction term that cancels every slot's blind once all slots'
//! ciphertexts have been accumulated. `decryptMulti` is stateful per
//! spec.md §6.1: it accepts `(idx, cipher)` pairs one at a time and only
//! yields a scalar once every slot has arrived.

use crate::error::{Error, Result};
use num_bigint::BigInt;
use num_traits::Zero;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Public schema parameters for multi-input FE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiSchemaParams {
    /// Security level parameter (spec.md §4.7 `FH_MULTI_IPE_SEC_LEVEL`).
    pub sec_level: u32,
    /// Total number of encryption slots (`sensorCnt · batchCnt`).
    pub vec_cnt: usize,
    /// Length of each slot's plaintext/rate vector (`batchSize`).
    pub vec_len: usize,
    /// Upper bound on sample values.
    pub bound_x: u64,
    /// Upper bound on rate values.
    pub bound_y: u64,
}

/// Master secret: one blinding vector per slot (`BHat`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiMasterSecret {
    slot_masks: Vec<Vec<BigInt>>,
}

/// Opaque "public key" produced alongside the master secret. Carried
/// through the wire protocol for shape-fidelity with the black-box
/// contract (`finalise(publicKey)`); this stand-in construction's
/// `finalize` does not actually need it since there is no pairing to
/// evaluate, but the field is threaded through regardless so swapping in
/// a real scheme later does not change any call site's shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiPubKey(BigInt);

/// This sensor's subkeys: the slice of `BHat` it owns (spec.md §4.5:
/// `BHat[sensorIdx·batchCnt : (sensorIdx+1)·batchCnt]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiEncryptionParams {
    /// Schema this key material was generated under.
    pub schema: MultiSchemaParams,
    /// Global slot index of this sensor's first batch.
    pub idx_offset: usize,
    subkeys: Vec<Vec<BigInt>>,
}

/// A multi-input ciphertext for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiCipher {
    /// Global slot index (`sensorIdx·batchCnt + batchIdx`).
    pub idx: usize,
    /// Blinded sample vector for this slot.
    pub values: Vec<BigInt>,
}

/// Derived decryption key for multi-input FE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiDerivedKey {
    rate_matrix: Vec<Vec<BigInt>>,
    correction: BigInt,
}

/// Decryption params: schema, derived key, and public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiDecryptionParams {
    /// Schema this key was derived under.
    pub schema: MultiSchemaParams,
    /// Derived key.
    pub derived_key: MultiDerivedKey,
    /// Public key from setup (threaded through, unused by this stand-in).
    pub pub_key: MultiPubKey,
}

/// `setupMulti(secLevel, vecCnt, vecLen, boundX, boundY) ->
/// (schemaParams, masterSecret, publicKey)`.
pub fn setup_multi(
    sec_level: u32,
    vec_cnt: usize,
    vec_len: usize,
    bound_x: u64,
    bound_y: u64,
) -> (MultiSchemaParams, MultiMasterSecret, MultiPubKey) {
    let mut rng = rand::thread_rng();
    let slot_masks: Vec<Vec<BigInt>> = (0..vec_cnt)
        .map(|_| (0..vec_len).map(|_| BigInt::from(rng.gen_range(0..=bound_x.max(1)))).collect())
        .collect();
    let pub_key = MultiPubKey(BigInt::from(rng.gen_range(1..=u32::MAX)));
    (
        MultiSchemaParams { sec_level, vec_cnt, vec_len, bound_x, bound_y },
        MultiMasterSecret { slot_masks },
        pub_key,
    )
}

/// Derive this sensor's encryption params: the contiguous slice of `BHat`
/// covering `[sensorIdx·batchesPerSensor, (sensorIdx+1)·batchesPerSensor)`.
pub fn encryption_params_multi(
    schema: &MultiSchemaParams,
    master: &MultiMasterSecret,
    sensor_idx: usize,
    sensor_cnt: usize,
    batches_per_sensor: usize,
) -> Result<MultiEncryptionParams> {
    if sensor_idx >= sensor_cnt {
        return Err(Error::SensorIdxOutOfRange { sensor_idx, sensor_cnt });
    }
    let idx_offset = sensor_idx * batches_per_sensor;
    let end = idx_offset + batches_per_sensor;
    if end > master.slot_masks.len() {
        return Err(Error::DimensionMismatch(format!(
            "sensor {sensor_idx} needs slots [{idx_offset}, {end}) but only {} exist",
            master.slot_masks.len()
        )));
    }
    Ok(MultiEncryptionParams {
        schema: schema.clone(),
        idx_offset,
        subkeys: master.slot_masks[idx_offset..end].to_vec(),
    })
}

/// `encryptMulti(samples, subkey) -> cipher` for the batch at local index
/// `local_batch_idx` within this sensor's allotted slots.
pub fn encrypt_multi(
    params: &MultiEncryptionParams,
    local_batch_idx: usize,
    samples: &[u64],
) -> Result<MultiCipher> {
    let mask = params.subkeys.get(local_batch_idx).ok_or_else(|| {
        Error::DimensionMismatch(format!(
            "local batch idx {local_batch_idx} out of range (have {} subkeys)",
            params.subkeys.len()
        ))
    })?;
    if samples.len() != mask.len() {
        return Err(Error::DimensionMismatch(format!(
            "expected {} samples, got {}",
            mask.len(),
            samples.len()
        )));
    }
    let values = samples.iter().zip(mask.iter()).map(|(x, b)| BigInt::from(*x) + b).collect();
    Ok(MultiCipher { idx: params.idx_offset + local_batch_idx, values })
}

/// `deriveKeyMulti(rateMatrix, masterSecret) -> derivedKey`. `rate_matrix`
/// has one row per slot, each row length `vec_len`.
pub fn derive_key_multi(master: &MultiMasterSecret, rate_matrix: &[Vec<u64>]) -> Result<MultiDerivedKey> {
    if rate_matrix.len() != master.slot_masks.len() {
        return Err(Error::DimensionMismatch(format!(
            "expected {} rate rows, got {}",
            master.slot_masks.len(),
            rate_matrix.len()
        )));
    }
    let mut correction = BigInt::zero();
    let mut rows = Vec::with_capacity(rate_matrix.len());
    for (mask_row, rate_row) in master.slot_masks.iter().zip(rate_matrix.iter()) {
        if mask_row.len() != rate_row.len() {
            return Err(Error::DimensionMismatch("rate row length mismatch".to_string()));
        }
        let row: Vec<BigInt> = rate_row.iter().map(|r| BigInt::from(*r)).collect();
        for (b, y) in mask_row.iter().zip(row.iter()) {
            correction += b * y;
        }
        rows.push(row);
    }
    Ok(MultiDerivedKey { rate_matrix: rows, correction })
}

/// Stateful multi-input decryptor (spec.md §6.1 `decryptMulti`): accepts
/// `(idx, cipher)` pairs and only yields a scalar once every expected slot
/// has arrived.
#[derive(Debug)]
pub struct MultiDecryptor {
    key: MultiDerivedKey,
    expected_slots: usize,
    received: HashSet<usize>,
    partial_sum: BigInt,
}

impl MultiDecryptor {
    /// Construct a decryptor expecting `expected_slots` distinct indices.
    pub fn new(params: MultiDecryptionParams, expected_slots: usize) -> Self {
        Self {
            key: params.derived_key,
            expected_slots,
            received: HashSet::new(),
            partial_sum: BigInt::zero(),
        }
    }

    /// Fold in one slot's ciphertext. Duplicate `idx` values are absorbed
    /// without changing accumulator state (spec.md §8 scenario 6).
    pub fn add_cipher(&mut self, cipher: MultiCipher) -> Result<()> {
        if cipher.idx >= self.key.rate_matrix.len() {
            return Err(Error::CipherIdxOutOfRange { idx: cipher.idx, expected: self.key.rate_matrix.len() });
        }
        if self.received.contains(&cipher.idx) {
            return Ok(());
        }
        let rate_row = &self.key.rate_matrix[cipher.idx];
        if cipher.values.len() != rate_row.len() {
            return Err(Error::DimensionMismatch("cipher slot width mismatch".to_string()));
        }
        for (c, y) in cipher.values.iter().zip(rate_row.iter()) {
            self.partial_sum += c * y;
        }
        self.received.insert(cipher.idx);
        Ok(())
    }

    /// Number of slots still missing.
    pub fn remaining_slots(&self) -> usize {
        self.expected_slots.saturating_sub(self.received.len())
    }

    /// `finalise(publicKey) -> scalar`. Errors if slots remain.
    pub fn finalize(&self) -> Result<BigInt> {
        if self.remaining_slots() > 0 {
            return Err(Error::IncompleteDecryption { remaining: self.remaining_slots() });
        }
        Ok(&self.partial_sum - &self.key.correction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_sensor_two_batch_inner_product() {
        let sensor_cnt = 2;
        let batch_cnt = 2;
        let batch_size = 2;
        let (schema, master, pub_key) = setup_multi(1, sensor_cnt * batch_cnt, batch_size, 10, 5);

        let params_a = encryption_params_multi(&schema, &master, 0, sensor_cnt, batch_cnt).unwrap();
        let params_b = encryption_params_multi(&schema, &master, 1, sensor_cnt, batch_cnt).unwrap();

        let cipher_a0 = encrypt_multi(&params_a, 0, &[1, 2]).unwrap();
        let cipher_a1 = encrypt_multi(&params_a, 1, &[3, 4]).unwrap();
        let cipher_b0 = encrypt_multi(&params_b, 0, &[5, 6]).unwrap();
        let cipher_b1 = encrypt_multi(&params_b, 1, &[7, 8]).unwrap();

        let rate_matrix = vec![vec![1u64, 1], vec![1, 1], vec![1, 1], vec![1, 1]];
        let derived_key = derive_key_multi(&master, &rate_matrix).unwrap();
        let params = MultiDecryptionParams { schema, derived_key, pub_key };

        let mut decryptor = MultiDecryptor::new(params, sensor_cnt * batch_cnt);
        decryptor.add_cipher(cipher_a0).unwrap();
        decryptor.add_cipher(cipher_b1).unwrap();
        decryptor.add_cipher(cipher_a1).unwrap();
        decryptor.add_cipher(cipher_b0).unwrap();

        assert_eq!(decryptor.remaining_slots(), 0);
        assert_eq!(decryptor.finalize().unwrap(), BigInt::from(36));
    }

    #[test]
    fn duplicate_cipher_is_absorbed() {
        let (schema, master, pub_key) = setup_multi(1, 1, 2, 10, 5);
        let params = encryption_params_multi(&schema, &master, 0, 1, 1).unwrap();
        let cipher = encrypt_multi(&params, 0, &[1, 2]).unwrap();
        let derived_key = derive_key_multi(&master, &[vec![1, 1]]).unwrap();
        let mut decryptor = MultiDecryptor::new(
            MultiDecryptionParams { schema, derived_key, pub_key },
            1,
        );
        decryptor.add_cipher(cipher.clone()).unwrap();
        let before = decryptor.finalize().unwrap();
        decryptor.add_cipher(cipher).unwrap();
        let after = decryptor.finalize().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn finalize_before_complete_errors() {
        let (schema, master, pub_key) = setup_multi(1, 2, 2, 10, 5);
        let derived_key = derive_key_multi(&master, &[vec![1, 1], vec![1, 1]]).unwrap();
        let decryptor = MultiDecryptor::new(MultiDecryptionParams { schema, derived_key, pub_key }, 2);
        assert!(decryptor.finalize().is_err());
    }
}
