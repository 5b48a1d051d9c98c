//! Dummy (plaintext) decryptor for `encryptionEnabled == false` (spec.md
//! §8 boundary: "result must still equal the inner product").
//!
//! The reference Go implementation's dummy decryptor
//! (`original_source/server/fe.go` `DummyDecryptor.AddCipher`) computes
//! `product := cipher.Samples[i] + rates[idx][i]` — addition, not
//! multiplication. That does not compute an inner product and fails
//! spec.md §8's universal quantifier for the `none` mode. This
//! implementation uses multiplication, which is the behavior every other
//! testable property in §8 depends on; see DESIGN.md for the deviation
//! note.

use crate::error::{Error, Result};
use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// No key material is needed to encrypt in the open — this exists purely
/// so the encryption-params shape is uniform across all three modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoneEncryptionParams;

/// A "ciphertext" that carries its samples in the clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoneCipher {
    /// Global slot index (`sensorIdx·batchCnt + batchIdx`).
    pub idx: usize,
    /// Plaintext samples for this slot.
    pub samples: Vec<BigInt>,
}

/// The rate matrix itself, in the clear, indexed by global slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoneDecryptionParams {
    /// Number of expected slots.
    pub slot_cnt: usize,
    rates: Vec<Vec<BigInt>>,
}

/// `encryptNone(samples) -> cipher` — the identity "encryption".
pub fn encrypt_none(idx: usize, samples: &[u64]) -> NoneCipher {
    NoneCipher { idx, samples: samples.iter().map(|s| BigInt::from(*s)).collect() }
}

/// Build decryption params directly from a flattened rate matrix (no key
/// derivation is needed since there is no blinding to cancel).
pub fn decryption_params_none(rate_matrix: &[Vec<u64>]) -> NoneDecryptionParams {
    NoneDecryptionParams {
        slot_cnt: rate_matrix.len(),
        rates: rate_matrix
            .iter()
            .map(|row| row.iter().map(|r| BigInt::from(*r)).collect())
            .collect(),
    }
}

/// Accumulates `Σ_i samples_i · rates_{idx,i}` across all expected slots.
#[derive(Debug)]
pub struct NoneDecryptor {
    params: NoneDecryptionParams,
    received: HashSet<usize>,
    accumulated: BigInt,
}

impl NoneDecryptor {
    /// Construct a decryptor over `params`.
    pub fn new(params: NoneDecryptionParams) -> Self {
        Self { params, received: HashSet::new(), accumulated: BigInt::zero() }
    }

    /// Fold in one slot. Duplicate indices are absorbed without changing
    /// accumulator state.
    pub fn add_cipher(&mut self, cipher: NoneCipher) -> Result<()> {
        if cipher.idx >= self.params.slot_cnt {
            return Err(Error::CipherIdxOutOfRange { idx: cipher.idx, expected: self.params.slot_cnt });
        }
        if self.received.contains(&cipher.idx) {
            return Ok(());
        }
        let rates = &self.params.rates[cipher.idx];
        if cipher.samples.len() != rates.len() {
            return Err(Error::DimensionMismatch("cipher slot width mismatch".to_string()));
        }
        for (sample, rate) in cipher.samples.iter().zip(rates.iter()) {
            self.accumulated += sample * rate;
        }
        self.received.insert(cipher.idx);
        Ok(())
    }

    /// Number of slots still missing.
    pub fn remaining_slots(&self) -> usize {
        self.params.slot_cnt.saturating_sub(self.received.len())
    }

    /// Final scalar. Errors if slots remain.
    pub fn finalize(&self) -> Result<BigInt> {
        if self.remaining_slots() > 0 {
            return Err(Error::IncompleteDecryption { remaining: self.remaining_slots() });
        }
        Ok(self.accumulated.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_true_inner_product_not_the_source_addition_bug() {
        let rate_matrix = vec![vec![1u64, 1], vec![1, 1], vec![1, 1], vec![1, 1]];
        let params = decryption_params_none(&rate_matrix);
        let mut decryptor = NoneDecryptor::new(params);
        decryptor.add_cipher(encrypt_none(0, &[1, 2])).unwrap();
        decryptor.add_cipher(encrypt_none(1, &[3, 4])).unwrap();
        decryptor.add_cipher(encrypt_none(2, &[5, 6])).unwrap();
        decryptor.add_cipher(encrypt_none(3, &[7, 8])).unwrap();
        assert_eq!(decryptor.finalize().unwrap(), BigInt::from(36));
    }

    #[test]
    fn duplicate_submission_is_idempotent() {
        let params = decryption_params_none(&[vec![2u64]]);
        let mut decryptor = NoneDecryptor::new(params);
        decryptor.add_cipher(encrypt_none(0, &[3])).unwrap();
        let first = decryptor.finalize().unwrap();
        decryptor.add_cipher(encrypt_none(0, &[3])).unwrap();
        let second = decryptor.finalize().unwrap();
        assert_eq!(first, second);
    }
}
