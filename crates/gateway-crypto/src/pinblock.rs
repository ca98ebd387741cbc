//! ISO 9564 format-0 PIN blocks.
//!
//! Format 0 XORs a PIN field (`0L` || PIN || 'F' padding) with a PAN field
//! ("0000" || rightmost 12 PAN digits excluding the check digit). Both fields
//! are 16 hex chars; the result is the clear PIN block handed to TDES.

use crate::errors::CryptoError;

/// Extract the PAN digits that participate in the PIN block.
///
/// For PANs longer than 12 digits this is the rightmost 12 digits excluding
/// the final check digit; shorter PANs are used as-is.
pub fn pan_account_part(pan: &str) -> &str {
    if pan.len() > 12 {
        &pan[pan.len() - 13..pan.len() - 1]
    } else {
        pan
    }
}

fn pan_field(pan: &str) -> Result<[u8; 8], CryptoError> {
    if pan.is_empty() || !pan.chars().all(|c| c.is_ascii_digit()) {
        return Err(CryptoError::InvalidPan(
            "PAN must be non-empty decimal digits".to_string(),
        ));
    }
    let part = pan_account_part(pan);
    let padded = format!("{part:0>16}");
    let mut field = [0u8; 8];
    hex::decode_to_slice(&padded, &mut field)
        .map_err(|_| CryptoError::InvalidPan(pan.to_string()))?;
    Ok(field)
}

/// Encode a clear PIN into a format-0 PIN block (16 uppercase hex chars).
pub fn format0_encode(pin: &str, pan: &str) -> Result<String, CryptoError> {
    if pin.len() < 4 || pin.len() > 12 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(CryptoError::PinLengthOutOfRange { length: pin.len() });
    }

    let pin_data = format!("{:02}{}", pin.len(), pin);
    let pin_data = format!("{pin_data:F<16}");
    debug_assert_eq!(pin_data.len(), 16);

    let mut pin_field = [0u8; 8];
    hex::decode_to_slice(&pin_data, &mut pin_field)
        .map_err(|_| CryptoError::InvalidHex(pin_data.clone()))?;
    let pan_field = pan_field(pan)?;

    let mut block = [0u8; 8];
    for i in 0..8 {
        block[i] = pin_field[i] ^ pan_field[i];
    }
    Ok(hex::encode_upper(block))
}

/// Decode a clear format-0 PIN block back to the PIN.
pub fn format0_decode(pinblock: &str, pan: &str) -> Result<String, CryptoError> {
    if pinblock.len() != 16 {
        return Err(CryptoError::InvalidLength {
            expected: "16 hex chars".to_string(),
            actual: pinblock.len(),
        });
    }
    let mut block = [0u8; 8];
    hex::decode_to_slice(pinblock, &mut block)
        .map_err(|_| CryptoError::InvalidHex(pinblock.to_string()))?;
    let pan_field = pan_field(pan)?;

    let mut pin_field = [0u8; 8];
    for i in 0..8 {
        pin_field[i] = block[i] ^ pan_field[i];
    }
    let pin_data = hex::encode_upper(pin_field);

    let length: usize = pin_data[..2]
        .parse()
        .map_err(|_| CryptoError::InvalidPinBlock("non-numeric length header".to_string()))?;
    if !(4..=12).contains(&length) {
        return Err(CryptoError::PinLengthOutOfRange { length });
    }
    let pin = &pin_data[2..2 + length];
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(CryptoError::InvalidPinBlock(
            "non-numeric PIN digits".to_string(),
        ));
    }
    Ok(pin.to_string())
}
