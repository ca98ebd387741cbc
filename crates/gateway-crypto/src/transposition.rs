//! PIN-block transposition between key zones.
//!
//! A PIN block entering the gateway is encrypted under the terminal key; it
//! leaves re-encrypted under the gateway zonal key, and again under the bank
//! key on the upstream leg. The clear PIN exists only inside [`transpose`],
//! in buffers zeroized before return, and is never persisted or logged.

use crate::errors::CryptoError;
use crate::pinblock::{format0_decode, format0_encode};
use crate::tdes::{tdes_decrypt, tdes_encrypt};
use zeroize::Zeroize;

/// Structural checks on an encrypted PIN block before attempting decryption.
///
/// Rejects blocks of the wrong length, the all-zero block, and PANs too
/// short to derive a PAN field from.
pub fn validate_pin_block(pinblock: &str, pan: &str) -> bool {
    if pinblock.len() != 16 || !pinblock.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    if pinblock.chars().all(|c| c == '0') {
        return false;
    }
    pan.len() >= 12
}

/// Re-encrypt an encrypted PIN block from `source_key` to `dest_key`.
///
/// The block is decrypted, decoded to the clear PIN, re-encoded against the
/// same PAN and encrypted under the destination key. Decode/re-encode is kept
/// even though the PAN does not change here, because chained transpositions
/// may re-derive the block against a different PAN.
pub fn transpose(
    source_key: &str,
    dest_key: &str,
    pinblock: &str,
    pan: &str,
) -> Result<String, CryptoError> {
    if !validate_pin_block(pinblock, pan) {
        return Err(CryptoError::InvalidPinBlock(
            "structural validation failed".to_string(),
        ));
    }

    let mut clear_block = tdes_decrypt(pinblock, source_key, false)?;
    let mut pin = format0_decode(&clear_block, pan).inspect_err(|_| clear_block.zeroize())?;
    clear_block.zeroize();

    let mut new_clear = format0_encode(&pin, pan).inspect_err(|_| pin.zeroize())?;
    pin.zeroize();

    let result = tdes_encrypt(&new_clear, dest_key, false);
    new_clear.zeroize();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const TERMINAL_KEY: &str = "9E4F7FF1F831F1132CD9B6C740B0134C";
    const ZONAL_KEY: &str = "40763BB5B0B910B5CE3297E58967CD2A";
    const BANK_KEY: &str = "1234567890ABCDEF1234567890ABCDEF";
    const PAN: &str = "4761739001010010";

    fn encrypt_under(pin: &str, key: &str) -> String {
        let clear = format0_encode(pin, PAN).unwrap();
        tdes_encrypt(&clear, key, false).unwrap()
    }

    #[test]
    fn test_transpose_terminal_to_zonal() {
        let under_terminal = encrypt_under("1234", TERMINAL_KEY);
        let under_zonal = transpose(TERMINAL_KEY, ZONAL_KEY, &under_terminal, PAN).unwrap();
        assert_ne!(under_terminal, under_zonal);

        let clear = tdes_decrypt(&under_zonal, ZONAL_KEY, false).unwrap();
        assert_eq!(format0_decode(&clear, PAN).unwrap(), "1234");
    }

    #[test]
    fn test_chained_transposition_preserves_pin() {
        let under_terminal = encrypt_under("739201", TERMINAL_KEY);
        let under_zonal = transpose(TERMINAL_KEY, ZONAL_KEY, &under_terminal, PAN).unwrap();
        let under_bank = transpose(ZONAL_KEY, BANK_KEY, &under_zonal, PAN).unwrap();

        let clear = tdes_decrypt(&under_bank, BANK_KEY, false).unwrap();
        assert_eq!(format0_decode(&clear, PAN).unwrap(), "739201");
    }

    #[test]
    fn test_transpose_is_pure() {
        let under_terminal = encrypt_under("1234", TERMINAL_KEY);
        let a = transpose(TERMINAL_KEY, ZONAL_KEY, &under_terminal, PAN).unwrap();
        let b = transpose(TERMINAL_KEY, ZONAL_KEY, &under_terminal, PAN).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_all_zero_block_rejected() {
        assert!(!validate_pin_block("0000000000000000", PAN));
        assert!(transpose(TERMINAL_KEY, ZONAL_KEY, "0000000000000000", PAN).is_err());
    }

    #[test]
    fn test_short_pan_rejected() {
        assert!(!validate_pin_block("041223C6FFEFEFFE", "47617390"));
    }

    #[test]
    fn test_bad_length_rejected() {
        assert!(!validate_pin_block("041223C6", PAN));
    }
}
