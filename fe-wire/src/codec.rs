//! Self-describing binary codec (spec.md §6.2): length-prefixed
//! big-integer byte strings, plus a tag byte discriminating the three FE
//! variants. Used for the high-volume, BigInt-heavy bodies — ciphertexts
//! and rate vectors — that cross the wire on every batch and every task.
//!
//! `EncryptionParams`/`DecryptionParams`/`SchemaParams` are fetched at
//! most once or twice per task rather than once per batch, so those ride
//! over the same tag-plus-length-prefixed-bigint shape but are composed
//! from `serde_json` for the structural (non-BigInt-leaf) fields rather
//! than hand-rolled field-by-field encoding — the BigInt leaves still go
//! through `num_bigint`'s serde support, which serializes as
//! length-prefixed decimal strings under the hood. This keeps the most
//! performance-sensitive path (cipher submission, on the hot loop of
//! every batch) fully hand-rolled while not duplicating the nested
//! variant structure for params that change far less often.

use crate::error::{Error, Result};
use fe_scheme::multi::MultiCipher;
use fe_scheme::none::NoneCipher;
use fe_scheme::single::SingleCipher;
use fe_scheme::{Cipher, DecryptionParams, EncryptionParams, SchemaParams};
use num_bigint::BigInt;

const TAG_NONE: u8 = 0;
const TAG_SINGLE: u8 = 1;
const TAG_MULTI: u8 = 2;

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn write_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn read_u32(cursor: &mut &[u8]) -> Result<u32> {
    if cursor.len() < 4 {
        return Err(Error::Codec("truncated u32".to_string()));
    }
    let (bytes, rest) = cursor.split_at(4);
    *cursor = rest;
    Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
}

fn read_u64(cursor: &mut &[u8]) -> Result<u64> {
    if cursor.len() < 8 {
        return Err(Error::Codec("truncated u64".to_string()));
    }
    let (bytes, rest) = cursor.split_at(8);
    *cursor = rest;
    Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
}

fn read_u8(cursor: &mut &[u8]) -> Result<u8> {
    if cursor.is_empty() {
        return Err(Error::Codec("truncated tag byte".to_string()));
    }
    let (bytes, rest) = cursor.split_at(1);
    *cursor = rest;
    Ok(bytes[0])
}

/// Write one length-prefixed big integer.
pub fn encode_bigint(buf: &mut Vec<u8>, value: &BigInt) {
    let bytes = value.to_signed_bytes_be();
    write_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(&bytes);
}

/// Read one length-prefixed big integer.
pub fn decode_bigint(cursor: &mut &[u8]) -> Result<BigInt> {
    let len = read_u32(cursor)? as usize;
    if cursor.len() < len {
        return Err(Error::Codec("truncated bigint payload".to_string()));
    }
    let (bytes, rest) = cursor.split_at(len);
    *cursor = rest;
    Ok(BigInt::from_signed_bytes_be(bytes))
}

/// Write a count-prefixed vector of big integers.
pub fn encode_bigint_vec(buf: &mut Vec<u8>, values: &[BigInt]) {
    write_u32(buf, values.len() as u32);
    for value in values {
        encode_bigint(buf, value);
    }
}

/// Read a count-prefixed vector of big integers.
pub fn decode_bigint_vec(cursor: &mut &[u8]) -> Result<Vec<BigInt>> {
    let len = read_u32(cursor)?;
    (0..len).map(|_| decode_bigint(cursor)).collect()
}

/// Encode a flat rate vector (`POST /rates/{taskId}` body).
pub fn encode_rates(rates: &[u64]) -> Vec<u8> {
    let values: Vec<BigInt> = rates.iter().map(|r| BigInt::from(*r)).collect();
    let mut buf = Vec::new();
    encode_bigint_vec(&mut buf, &values);
    buf
}

/// Decode a flat rate vector, rejecting negative entries (rates are
/// always non-negative; a negative value means the payload is corrupt or
/// malicious, not merely unexpected — spec.md §7 "Misuse").
pub fn decode_rates(bytes: &[u8]) -> Result<Vec<u64>> {
    let mut cursor = bytes;
    let values = decode_bigint_vec(&mut cursor)?;
    values
        .into_iter()
        .map(|v| {
            u64::try_from(v).map_err(|_| Error::Codec("negative rate value".to_string()))
        })
        .collect()
}

/// Encode a ciphertext (`POST /task/{taskId}/{sensorId}` body).
pub fn encode_cipher(cipher: &Cipher) -> Vec<u8> {
    let mut buf = Vec::new();
    match cipher {
        Cipher::None(c) => {
            buf.push(TAG_NONE);
            write_u64(&mut buf, c.idx as u64);
            encode_bigint_vec(&mut buf, &c.samples);
        }
        Cipher::Single(c) => {
            buf.push(TAG_SINGLE);
            encode_bigint_vec(&mut buf, &c.0);
        }
        Cipher::Multi(c) => {
            buf.push(TAG_MULTI);
            write_u64(&mut buf, c.idx as u64);
            encode_bigint_vec(&mut buf, &c.values);
        }
    }
    buf
}

/// Decode a ciphertext.
pub fn decode_cipher(bytes: &[u8]) -> Result<Cipher> {
    let mut cursor = bytes;
    let tag = read_u8(&mut cursor)?;
    match tag {
        TAG_NONE => {
            let idx = read_u64(&mut cursor)? as usize;
            let samples = decode_bigint_vec(&mut cursor)?;
            Ok(Cipher::None(NoneCipher { idx, samples }))
        }
        TAG_SINGLE => {
            let values = decode_bigint_vec(&mut cursor)?;
            Ok(Cipher::Single(SingleCipher(values)))
        }
        TAG_MULTI => {
            let idx = read_u64(&mut cursor)? as usize;
            let values = decode_bigint_vec(&mut cursor)?;
            Ok(Cipher::Multi(MultiCipher { idx, values }))
        }
        other => Err(Error::Codec(format!("unknown cipher tag {other}"))),
    }
}

/// Encode encryption params via tag + JSON (see module docs for rationale).
pub fn encode_encryption_params(params: &EncryptionParams) -> Result<Vec<u8>> {
    let tag = match params {
        EncryptionParams::None(_) => TAG_NONE,
        EncryptionParams::Single(_) => TAG_SINGLE,
        EncryptionParams::Multi(_) => TAG_MULTI,
    };
    encode_tagged_json(tag, params)
}

/// Decode encryption params.
pub fn decode_encryption_params(bytes: &[u8]) -> Result<EncryptionParams> {
    decode_tagged_json(bytes)
}

/// Encode decryption params via tag + JSON.
pub fn encode_decryption_params(params: &DecryptionParams) -> Result<Vec<u8>> {
    let tag = match params {
        DecryptionParams::None(_) => TAG_NONE,
        DecryptionParams::Single(_) => TAG_SINGLE,
        DecryptionParams::Multi(_) => TAG_MULTI,
    };
    encode_tagged_json(tag, params)
}

/// Decode decryption params.
pub fn decode_decryption_params(bytes: &[u8]) -> Result<DecryptionParams> {
    decode_tagged_json(bytes)
}

/// Encode schema params via tag + JSON.
pub fn encode_schema_params(params: &SchemaParams) -> Result<Vec<u8>> {
    let tag = match params {
        SchemaParams::None => TAG_NONE,
        SchemaParams::Single(_) => TAG_SINGLE,
        SchemaParams::Multi(_) => TAG_MULTI,
    };
    encode_tagged_json(tag, params)
}

/// Decode schema params.
pub fn decode_schema_params(bytes: &[u8]) -> Result<SchemaParams> {
    decode_tagged_json(bytes)
}

fn encode_tagged_json<T: serde::Serialize>(tag: u8, value: &T) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(value)?;
    let mut buf = Vec::with_capacity(json.len() + 1);
    buf.push(tag);
    buf.extend_from_slice(&json);
    Ok(buf)
}

fn decode_tagged_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut cursor = bytes;
    let _tag = read_u8(&mut cursor)?;
    Ok(serde_json::from_slice(cursor)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe_scheme::none::encrypt_none;

    #[test]
    fn cipher_round_trips() {
        let cipher = Cipher::None(encrypt_none(3, &[1, 2, 3]));
        let bytes = encode_cipher(&cipher);
        let decoded = decode_cipher(&bytes).unwrap();
        assert_eq!(cipher, decoded);
    }

    #[test]
    fn rates_round_trip() {
        let rates = vec![2u64, 0, 3, 5];
        let bytes = encode_rates(&rates);
        let decoded = decode_rates(&bytes).unwrap();
        assert_eq!(rates, decoded);
    }

    #[test]
    fn decode_cipher_rejects_unknown_tag() {
        let bytes = [9u8, 0, 0, 0, 0];
        assert!(decode_cipher(&bytes).is_err());
    }

    #[test]
    fn decode_cipher_rejects_truncated_payload() {
        assert!(decode_cipher(&[TAG_SINGLE]).is_err());
    }
}
