//! Field-aware masking applied before any message reaches a sink.
//!
//! Three field classes:
//!
//! - **Fully masked**: PAN (first 4 + last 4 kept), expiry, track data, EMV
//!   and private-use fields (asterisks, capped at 20).
//! - **Partially masked**: RRN, terminal ID, merchant ID (edges visible).
//! - **PIN data (field 52)**: wiped to a placeholder; the encrypted block
//!   never appears in the transaction log view.

use gateway_codec::IsoMessage;
use tracing::info;

/// Fields whose content is replaced outright.
const FULLY_MASKED: [u8; 7] = [2, 14, 35, 45, 55, 120, 126];

/// Fields that keep their first and last characters.
const PARTIALLY_MASKED: [u8; 3] = [37, 41, 42];

/// Encrypted PIN block.
const PIN_FIELD: u8 = 52;

/// One masked field ready for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedField {
    pub number: u8,
    pub value: String,
}

/// Apply the masking policy to a single field value.
pub fn mask_field_value(number: u8, value: &str) -> String {
    if number == PIN_FIELD {
        return "[PIN]".to_string();
    }
    if FULLY_MASKED.contains(&number) {
        return match number {
            2 => mask_pan(value),
            14 => "****".to_string(),
            35 => mask_track2(value),
            _ => "*".repeat(value.len().min(20)),
        };
    }
    if PARTIALLY_MASKED.contains(&number) {
        return mask_partial(value);
    }
    value.to_string()
}

/// All present fields of a message, masked, in ascending order.
pub fn masked_fields(msg: &IsoMessage) -> Vec<MaskedField> {
    msg.fields()
        .map(|(number, value)| MaskedField {
            number,
            value: mask_field_value(number, value),
        })
        .collect()
}

fn render(msg: &IsoMessage) -> String {
    masked_fields(msg)
        .into_iter()
        .map(|f| format!("{:03}={}", f.number, f.value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log an inbound message under the masking policy.
pub fn log_incoming(msg: &IsoMessage, source: &str) {
    info!(
        mti = msg.mti(),
        source,
        fields = %render(msg),
        "incoming message"
    );
}

/// Log an outbound message under the masking policy.
pub fn log_outgoing(msg: &IsoMessage, destination: &str) {
    info!(
        mti = msg.mti(),
        destination,
        fields = %render(msg),
        "outgoing message"
    );
}

fn mask_pan(pan: &str) -> String {
    if pan.len() < 8 {
        return "****".to_string();
    }
    format!(
        "{}{}{}",
        &pan[..4],
        "*".repeat(pan.len() - 8),
        &pan[pan.len() - 4..]
    )
}

/// Mask track-2 data, preserving the separator structure.
fn mask_track2(track2: &str) -> String {
    let separator = track2.find(|c| matches!(c, '=' | 'D' | 'd'));
    match separator {
        Some(index) if index > 0 => {
            let pan = &track2[..index];
            let rest = &track2[index..];
            format!(
                "{}{}{}",
                mask_pan(pan),
                &rest[..1],
                "*".repeat(rest.len().saturating_sub(1))
            )
        }
        _ => "*".repeat(track2.len().min(20)),
    }
}

fn mask_partial(value: &str) -> String {
    match value.len() {
        0..=4 => "*".repeat(value.len()),
        5..=8 => format!(
            "{}{}{}",
            &value[..2],
            "*".repeat(value.len() - 4),
            &value[value.len() - 2..]
        ),
        _ => format!(
            "{}{}{}",
            &value[..3],
            "*".repeat(value.len() - 6),
            &value[value.len() - 3..]
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_keeps_edges() {
        assert_eq!(
            mask_field_value(2, "4532015112830366"),
            "4532********0366"
        );
        assert_eq!(mask_field_value(2, "4532"), "****");
    }

    #[test]
    fn test_expiry_fully_hidden() {
        assert_eq!(mask_field_value(14, "2612"), "****");
    }

    #[test]
    fn test_track2_keeps_structure() {
        let masked = mask_field_value(35, "4532015112830366D2612101123456789");
        assert_eq!(masked, "4532********0366D****************");
    }

    #[test]
    fn test_track2_without_separator() {
        assert_eq!(mask_field_value(35, "45320151"), "********");
    }

    #[test]
    fn test_pin_block_wiped() {
        assert_eq!(mask_field_value(52, "041223C6FFEFEFFE"), "[PIN]");
    }

    #[test]
    fn test_partial_masking_tiers() {
        assert_eq!(mask_field_value(41, "TID1"), "****");
        assert_eq!(mask_field_value(41, "TERM0001"), "TE****01");
        assert_eq!(mask_field_value(37, "123456789012"), "123******012");
    }

    #[test]
    fn test_private_use_capped() {
        let long = "A".repeat(100);
        assert_eq!(mask_field_value(126, &long), "*".repeat(20));
    }

    #[test]
    fn test_unlisted_fields_pass_through() {
        assert_eq!(mask_field_value(4, "000000005000"), "000000005000");
        assert_eq!(mask_field_value(39, "00"), "00");
    }

    #[test]
    fn test_masked_fields_cover_message() {
        let msg = IsoMessage::new("0200")
            .with(2, "4532015112830366")
            .with(4, "000000005000")
            .with(52, "041223C6FFEFEFFE");
        let masked = masked_fields(&msg);
        assert_eq!(masked.len(), 3);
        assert_eq!(masked[0].value, "4532********0366");
        assert_eq!(masked[1].value, "000000005000");
        assert_eq!(masked[2].value, "[PIN]");
    }
}
