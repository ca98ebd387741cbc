//! Pack and unpack.
//!
//! Wire layout: 4 ASCII MTI chars, primary bitmap, optional secondary
//! bitmap, then every present field in ascending order encoded per its
//! dictionary entry. Bit 1 of the primary bitmap announces the secondary
//! bitmap; bit N (counted from the most significant end) announces field N.

use crate::bcd;
use crate::dictionary::{BitmapForm, Dictionary};
use crate::errors::CodecError;
use crate::field::{FieldDef, FieldKind};
use crate::message::IsoMessage;

/// Largest frame either dialect will produce or accept.
pub const MAX_MESSAGE_LEN: usize = 10_240;

fn bitmap_bit(bitmap: u64, bit: u8) -> bool {
    bitmap & (1u64 << (64 - bit as u32)) != 0
}

fn set_bitmap_bit(bitmap: &mut u64, bit: u8) {
    *bitmap |= 1u64 << (64 - bit as u32);
}

/// Pack a message under the given dictionary.
pub fn pack(dict: &Dictionary, msg: &IsoMessage) -> Result<Vec<u8>, CodecError> {
    let mti = msg.mti();
    if mti.len() != 4 || !mti.chars().all(|c| c.is_ascii_digit()) {
        return Err(CodecError::Mti(mti.to_string()));
    }

    let mut primary = 0u64;
    let mut secondary = 0u64;
    for number in msg.field_numbers() {
        if number <= 64 {
            set_bitmap_bit(&mut primary, number);
        } else {
            set_bitmap_bit(&mut secondary, number - 64);
        }
    }
    if secondary != 0 {
        set_bitmap_bit(&mut primary, 1);
    }

    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(mti.as_bytes());
    emit_bitmap(&mut out, dict.bitmap, primary);
    if secondary != 0 {
        emit_bitmap(&mut out, dict.bitmap, secondary);
    }

    for (number, value) in msg.fields() {
        let def = dict
            .field(number)
            .ok_or(CodecError::UnknownField { number })?;
        emit_field(&mut out, def, value)?;
    }

    if out.len() > MAX_MESSAGE_LEN {
        return Err(CodecError::Bitmap(format!(
            "packed message of {} bytes exceeds {MAX_MESSAGE_LEN}",
            out.len()
        )));
    }
    Ok(out)
}

fn emit_bitmap(out: &mut Vec<u8>, form: BitmapForm, bitmap: u64) {
    match form {
        BitmapForm::AsciiHex => out.extend_from_slice(format!("{bitmap:016X}").as_bytes()),
        BitmapForm::Binary => out.extend_from_slice(&bitmap.to_be_bytes()),
    }
}

fn emit_field(out: &mut Vec<u8>, def: &FieldDef, value: &str) -> Result<(), CodecError> {
    let number = def.number;
    match def.kind {
        FieldKind::FixedNumeric => {
            if value.len() > def.length {
                return Err(CodecError::field(
                    number,
                    format!("length {} exceeds {}", value.len(), def.length),
                ));
            }
            if !value.chars().all(|c| c.is_ascii_digit()) {
                return Err(CodecError::field(number, "non-numeric value"));
            }
            if def.bcd {
                out.extend_from_slice(&bcd::pack_digits(number, value, def.length)?);
            } else {
                out.extend_from_slice(format!("{value:0>width$}", width = def.length).as_bytes());
            }
        }
        FieldKind::FixedChar => {
            if value.len() > def.length {
                return Err(CodecError::field(
                    number,
                    format!("length {} exceeds {}", value.len(), def.length),
                ));
            }
            out.extend_from_slice(format!("{value:<width$}", width = def.length).as_bytes());
        }
        FieldKind::FixedBinary => {
            let bytes = hex::decode(value)
                .map_err(|_| CodecError::field(number, "binary field is not valid hex"))?;
            if bytes.len() != def.length {
                return Err(CodecError::field(
                    number,
                    format!("binary length {} != {}", bytes.len(), def.length),
                ));
            }
            out.extend_from_slice(&bytes);
        }
        FieldKind::LlNum => {
            if value.len() > def.length || value.len() > 99 {
                return Err(CodecError::field(
                    number,
                    format!("length {} exceeds {}", value.len(), def.length),
                ));
            }
            // Track-2 style separators travel inside LL fields on both legs.
            if !value.chars().all(|c| c.is_ascii_digit() || matches!(c, 'D' | '=')) {
                return Err(CodecError::field(number, "non-numeric value"));
            }
            out.extend_from_slice(format!("{:02}", value.len()).as_bytes());
            out.extend_from_slice(value.as_bytes());
        }
        FieldKind::LllChar => {
            if value.len() > def.length || value.len() > 999 {
                return Err(CodecError::field(
                    number,
                    format!("length {} exceeds {}", value.len(), def.length),
                ));
            }
            out.extend_from_slice(format!("{:03}", value.len()).as_bytes());
            out.extend_from_slice(value.as_bytes());
        }
        FieldKind::LllBinary => {
            let bytes = hex::decode(value)
                .map_err(|_| CodecError::field(number, "binary field is not valid hex"))?;
            if bytes.len() > def.length || bytes.len() > 999 {
                return Err(CodecError::field(
                    number,
                    format!("binary length {} exceeds {}", bytes.len(), def.length),
                ));
            }
            out.extend_from_slice(format!("{:03}", bytes.len()).as_bytes());
            out.extend_from_slice(&bytes);
        }
    }
    Ok(())
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.pos + n > self.data.len() {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: self.pos + n - self.data.len(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_str(&mut self, n: usize, number: u8) -> Result<&'a str, CodecError> {
        std::str::from_utf8(self.take(n)?)
            .map_err(|_| CodecError::field(number, "non-ASCII bytes"))
    }
}

/// Unpack a message under the given dictionary.
///
/// Fails on the first protocol-fatal error; never returns a partial message.
pub fn unpack(dict: &Dictionary, data: &[u8]) -> Result<IsoMessage, CodecError> {
    let mut cursor = Cursor { data, pos: 0 };

    let mti_bytes = cursor.take(4).map_err(|_| CodecError::Mti("short".into()))?;
    let mti = std::str::from_utf8(mti_bytes)
        .ok()
        .filter(|m| m.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| CodecError::Mti(format!("{mti_bytes:02X?}")))?;

    let primary = read_bitmap(&mut cursor, dict.bitmap)?;
    let secondary = if bitmap_bit(primary, 1) {
        Some(read_bitmap(&mut cursor, dict.bitmap)?)
    } else {
        None
    };

    let mut msg = IsoMessage::new(mti);
    for number in 2..=128u8 {
        let present = if number <= 64 {
            bitmap_bit(primary, number)
        } else {
            match secondary {
                Some(bitmap) => bitmap_bit(bitmap, number - 64),
                None => false,
            }
        };
        if !present {
            continue;
        }
        let def = dict
            .field(number)
            .ok_or(CodecError::UnknownField { number })?;
        let value = read_field(&mut cursor, def)?;
        msg.set(number, value);
    }

    if cursor.pos != data.len() {
        return Err(CodecError::Bitmap(format!(
            "{} trailing bytes after last field",
            data.len() - cursor.pos
        )));
    }
    Ok(msg)
}

fn read_bitmap(cursor: &mut Cursor<'_>, form: BitmapForm) -> Result<u64, CodecError> {
    match form {
        BitmapForm::AsciiHex => {
            let hex16 = std::str::from_utf8(cursor.take(16)?)
                .map_err(|_| CodecError::Bitmap("non-ASCII bitmap".into()))?;
            u64::from_str_radix(hex16, 16)
                .map_err(|_| CodecError::Bitmap(format!("bad hex bitmap {hex16:?}")))
        }
        BitmapForm::Binary => {
            let bytes = cursor.take(8)?;
            Ok(u64::from_be_bytes(bytes.try_into().expect("8 bytes")))
        }
    }
}

fn read_field(cursor: &mut Cursor<'_>, def: &FieldDef) -> Result<String, CodecError> {
    let number = def.number;
    match def.kind {
        FieldKind::FixedNumeric => {
            if def.bcd {
                let bytes = cursor.take(bcd::packed_len(def.length))?;
                bcd::unpack_digits(number, bytes, def.length)
            } else {
                let value = cursor.take_str(def.length, number)?;
                if !value.chars().all(|c| c.is_ascii_digit()) {
                    return Err(CodecError::field(number, "non-numeric value"));
                }
                Ok(value.to_string())
            }
        }
        FieldKind::FixedChar => {
            let value = cursor.take_str(def.length, number)?;
            Ok(value.trim_end().to_string())
        }
        FieldKind::FixedBinary => {
            let bytes = cursor.take(def.length)?;
            Ok(hex::encode_upper(bytes))
        }
        FieldKind::LlNum => {
            let len = read_len(cursor, number, 2)?;
            if len > def.length {
                return Err(CodecError::field(
                    number,
                    format!("declared length {len} exceeds {}", def.length),
                ));
            }
            let value = cursor.take_str(len, number)?;
            if !value.chars().all(|c| c.is_ascii_digit() || matches!(c, 'D' | '=')) {
                return Err(CodecError::field(number, "non-numeric value"));
            }
            Ok(value.to_string())
        }
        FieldKind::LllChar => {
            let len = read_len(cursor, number, 3)?;
            if len > def.length {
                return Err(CodecError::field(
                    number,
                    format!("declared length {len} exceeds {}", def.length),
                ));
            }
            Ok(cursor.take_str(len, number)?.to_string())
        }
        FieldKind::LllBinary => {
            let len = read_len(cursor, number, 3)?;
            if len > def.length {
                return Err(CodecError::field(
                    number,
                    format!("declared length {len} exceeds {}", def.length),
                ));
            }
            Ok(hex::encode_upper(cursor.take(len)?))
        }
    }
}

fn read_len(cursor: &mut Cursor<'_>, number: u8, digits: usize) -> Result<usize, CodecError> {
    let header = cursor.take_str(digits, number)?;
    header
        .parse()
        .map_err(|_| CodecError::field(number, format!("bad length header {header:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{bank_dictionary, pos_dictionary};

    fn sample_financial() -> IsoMessage {
        IsoMessage::new("0200")
            .with(2, "4532015112830366")
            .with(3, "000000")
            .with(4, "000000005000")
            .with(11, "000123")
            .with(41, "TERM0001")
    }

    #[test]
    fn test_pos_roundtrip() {
        let msg = sample_financial();
        let wire = pack(pos_dictionary(), &msg).unwrap();
        let decoded = unpack(pos_dictionary(), &wire).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_bank_roundtrip() {
        let msg = sample_financial().with(52, "041223C6FFEFEFFE");
        let wire = pack(bank_dictionary(), &msg).unwrap();
        let decoded = unpack(bank_dictionary(), &wire).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_pos_wire_layout() {
        let msg = IsoMessage::new("0800").with(3, "990002").with(11, "000042");
        let wire = pack(pos_dictionary(), &msg).unwrap();
        // MTI, then 16 ASCII hex bitmap chars: bits 3 and 11 set.
        assert_eq!(&wire[..4], b"0800");
        assert_eq!(&wire[4..20], b"2020000000000000");
        assert_eq!(&wire[20..26], b"990002");
        assert_eq!(&wire[26..32], b"000042");
    }

    #[test]
    fn test_bank_bitmap_is_binary_and_bcd_applied() {
        let msg = IsoMessage::new("0800").with(3, "990002").with(11, "000042");
        let wire = pack(bank_dictionary(), &msg).unwrap();
        assert_eq!(&wire[..4], b"0800");
        assert_eq!(&wire[4..12], &[0x20, 0x20, 0, 0, 0, 0, 0, 0]);
        // F3 and F11 pack to 3 BCD bytes each.
        assert_eq!(&wire[12..15], &[0x99, 0x00, 0x02]);
        assert_eq!(&wire[15..18], &[0x00, 0x00, 0x42]);
        assert_eq!(wire.len(), 18);
    }

    #[test]
    fn test_secondary_bitmap_boundary() {
        // Only primary-range fields: no secondary bitmap on the wire.
        let msg64 = IsoMessage::new("0200").with(4, "000000000100");
        let wire = pack(pos_dictionary(), &msg64).unwrap();
        assert_eq!(wire.len(), 4 + 16 + 12);

        // Field 65+ forces the secondary bitmap and bit 1.
        let msg120 = IsoMessage::new("0200").with(120, "HELLO");
        let wire = pack(pos_dictionary(), &msg120).unwrap();
        assert_eq!(&wire[4..5], b"8");
        assert_eq!(wire.len(), 4 + 16 + 16 + 3 + 5);
        let decoded = unpack(pos_dictionary(), &wire).unwrap();
        assert_eq!(decoded.get(120), Some("HELLO"));
    }

    #[test]
    fn test_variable_length_zero_and_max() {
        let empty = IsoMessage::new("0200").with(120, "");
        let wire = pack(pos_dictionary(), &empty).unwrap();
        let decoded = unpack(pos_dictionary(), &wire).unwrap();
        assert_eq!(decoded.get(120), Some(""));

        let max = "9".repeat(19);
        let msg = IsoMessage::new("0200").with(2, max.clone());
        let wire = pack(pos_dictionary(), &msg).unwrap();
        let decoded = unpack(pos_dictionary(), &wire).unwrap();
        assert_eq!(decoded.get(2), Some(max.as_str()));
    }

    #[test]
    fn test_fixed_char_padding_trimmed() {
        let msg = IsoMessage::new("0200").with(41, "TID1");
        let wire = pack(pos_dictionary(), &msg).unwrap();
        assert_eq!(&wire[wire.len() - 8..], b"TID1    ");
        let decoded = unpack(pos_dictionary(), &wire).unwrap();
        assert_eq!(decoded.get(41), Some("TID1"));
    }

    #[test]
    fn test_unknown_field_rejected_both_ways() {
        let msg = IsoMessage::new("0200").with(99, "X");
        assert!(matches!(
            pack(pos_dictionary(), &msg),
            Err(CodecError::UnknownField { number: 99 })
        ));

        // Hand-build a wire image whose bitmap claims field 99.
        let mut wire = Vec::new();
        wire.extend_from_slice(b"0200");
        let mut primary = 0u64;
        set_bitmap_bit(&mut primary, 1);
        wire.extend_from_slice(format!("{primary:016X}").as_bytes());
        let mut secondary = 0u64;
        set_bitmap_bit(&mut secondary, 99 - 64);
        wire.extend_from_slice(format!("{secondary:016X}").as_bytes());
        wire.extend_from_slice(b"X");
        assert!(matches!(
            unpack(pos_dictionary(), &wire),
            Err(CodecError::UnknownField { number: 99 })
        ));
    }

    #[test]
    fn test_truncated_field_rejected() {
        let msg = sample_financial();
        let wire = pack(pos_dictionary(), &msg).unwrap();
        assert!(matches!(
            unpack(pos_dictionary(), &wire[..wire.len() - 3]),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let msg = sample_financial();
        let mut wire = pack(pos_dictionary(), &msg).unwrap();
        wire.extend_from_slice(b"JUNK");
        assert!(unpack(pos_dictionary(), &wire).is_err());
    }

    #[test]
    fn test_non_numeric_in_numeric_field_rejected() {
        let msg = IsoMessage::new("0200").with(4, "00000000ABCD");
        assert!(matches!(
            pack(pos_dictionary(), &msg),
            Err(CodecError::Field { number: 4, .. })
        ));
    }

    #[test]
    fn test_bad_mti_rejected() {
        assert!(matches!(
            unpack(pos_dictionary(), b"02"),
            Err(CodecError::Mti(_))
        ));
        let msg = IsoMessage::new("02X0");
        assert!(matches!(pack(pos_dictionary(), &msg), Err(CodecError::Mti(_))));
    }

    #[test]
    fn test_track2_separator_allowed() {
        let msg = IsoMessage::new("0200").with(35, "4532015112830366D26121011234567");
        let wire = pack(pos_dictionary(), &msg).unwrap();
        let decoded = unpack(pos_dictionary(), &wire).unwrap();
        assert_eq!(decoded.get(35), Some("4532015112830366D26121011234567"));
    }
}
