//! Two- and three-key TDES in ECB mode over hex strings.
//!
//! The EDE pipeline per 64-bit block is E(K1) -> D(K2) -> E(K3), with K3 = K1
//! for double-length keys. Data may span multiple blocks (any multiple of 16
//! hex chars); blocks are processed independently (ECB).

use crate::des::{des_decrypt, des_encrypt};
use crate::errors::CryptoError;
use rand::rngs::OsRng;
use rand::RngCore;

/// Key check value input: the all-zero block.
const ZERO_BLOCK: &str = "0000000000000000";

struct KeyParts<'a> {
    k1: &'a str,
    k2: &'a str,
    k3: &'a str,
}

fn split_key(key: &str, three_key: bool) -> Result<KeyParts<'_>, CryptoError> {
    let expected = if three_key { 48 } else { 32 };
    if key.len() != expected {
        return Err(CryptoError::InvalidLength {
            expected: format!("{expected} hex chars of key material"),
            actual: key.len(),
        });
    }
    if !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CryptoError::InvalidHex("key".to_string()));
    }
    Ok(KeyParts {
        k1: &key[0..16],
        k2: &key[16..32],
        k3: if three_key { &key[32..48] } else { &key[0..16] },
    })
}

fn check_data(data: &str) -> Result<(), CryptoError> {
    if data.is_empty() || data.len() % 16 != 0 {
        return Err(CryptoError::InvalidLength {
            expected: "a non-empty multiple of 16 hex chars".to_string(),
            actual: data.len(),
        });
    }
    Ok(())
}

/// TDES-encrypt `data` (multiple of 16 hex chars) under a 32- or 48-hex key.
pub fn tdes_encrypt(data: &str, key: &str, three_key: bool) -> Result<String, CryptoError> {
    check_data(data)?;
    let parts = split_key(key, three_key)?;

    let mut out = String::with_capacity(data.len());
    for block in blocks(data) {
        let step1 = des_encrypt(block, parts.k1)?;
        let step2 = des_decrypt(&step1, parts.k2)?;
        out.push_str(&des_encrypt(&step2, parts.k3)?);
    }
    Ok(out)
}

/// TDES-decrypt `data` (multiple of 16 hex chars) under a 32- or 48-hex key.
pub fn tdes_decrypt(data: &str, key: &str, three_key: bool) -> Result<String, CryptoError> {
    check_data(data)?;
    let parts = split_key(key, three_key)?;

    let mut out = String::with_capacity(data.len());
    for block in blocks(data) {
        let step1 = des_decrypt(block, parts.k3)?;
        let step2 = des_encrypt(&step1, parts.k2)?;
        out.push_str(&des_decrypt(&step2, parts.k1)?);
    }
    Ok(out)
}

fn blocks(data: &str) -> impl Iterator<Item = &str> {
    (0..data.len() / 16).map(move |i| &data[i * 16..(i + 1) * 16])
}

/// Key check value: first 6 hex chars of the TDES-encrypted zero block.
pub fn kcv(key: &str) -> Result<String, CryptoError> {
    let three_key = key.len() == 48;
    Ok(tdes_encrypt(ZERO_BLOCK, key, three_key)?[..6].to_string())
}

/// Generate fresh TDES key material from the OS CSPRNG.
///
/// `length` is 2 for a double-length key (32 hex chars) or 3 for
/// triple-length (48 hex chars).
pub fn generate_key(length: u8) -> Result<String, CryptoError> {
    if !matches!(length, 2 | 3) {
        return Err(CryptoError::KeyGenerationFailed(format!(
            "unsupported key length {length}"
        )));
    }
    let mut material = vec![0u8; length as usize * 8];
    OsRng.fill_bytes(&mut material);
    Ok(hex::encode_upper(material))
}
