//! Card number validation: Luhn check, brand detection, PAN masking.

use regex::Regex;
use std::sync::OnceLock;

/// Card brands recognised by prefix pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardBrand {
    Visa,
    Mastercard,
    AmericanExpress,
    Discover,
    Jcb,
    DinersClub,
    Maestro,
    Unknown,
}

impl CardBrand {
    /// Human-readable brand name.
    pub fn display_name(&self) -> &'static str {
        match self {
            CardBrand::Visa => "Visa",
            CardBrand::Mastercard => "Mastercard",
            CardBrand::AmericanExpress => "American Express",
            CardBrand::Discover => "Discover",
            CardBrand::Jcb => "JCB",
            CardBrand::DinersClub => "Diners Club",
            CardBrand::Maestro => "Maestro",
            CardBrand::Unknown => "Unknown",
        }
    }
}

/// Outcome of validating a PAN.
#[derive(Debug, Clone)]
pub struct CardValidation {
    /// Luhn passed and the brand is recognised.
    pub valid: bool,
    /// Luhn checksum result alone.
    pub luhn_ok: bool,
    /// Detected brand.
    pub brand: CardBrand,
    /// Masked PAN safe for logs.
    pub masked: String,
    /// Failure narration when not valid.
    pub error: Option<String>,
}

fn brand_patterns() -> &'static [(CardBrand, Regex)] {
    static PATTERNS: OnceLock<Vec<(CardBrand, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (CardBrand::Visa, r"^4[0-9]{12}(?:[0-9]{3})?$"),
            (
                CardBrand::Mastercard,
                r"^5[1-5][0-9]{14}$|^2(?:2(?:2[1-9]|[3-9][0-9])|[3-6][0-9][0-9]|7(?:[01][0-9]|20))[0-9]{12}$",
            ),
            (CardBrand::AmericanExpress, r"^3[47][0-9]{13}$"),
            (CardBrand::Discover, r"^6(?:011|5[0-9]{2})[0-9]{12}$"),
            (CardBrand::Jcb, r"^(?:2131|1800|35\d{3})\d{11}$"),
            (CardBrand::DinersClub, r"^3(?:0[0-5]|[68][0-9])[0-9]{11}$"),
            (
                CardBrand::Maestro,
                r"^(?:5[0678]\d\d|6304|6390|67\d\d)\d{8,15}$",
            ),
        ]
        .into_iter()
        .map(|(brand, pattern)| (brand, Regex::new(pattern).expect("static pattern")))
        .collect()
    })
}

/// Detect the card brand for a clean (digits-only) PAN.
pub fn detect_brand(pan: &str) -> CardBrand {
    for (brand, pattern) in brand_patterns() {
        if pattern.is_match(pan) {
            return *brand;
        }
    }
    CardBrand::Unknown
}

/// Luhn checksum over a digits-only string.
///
/// From the rightmost digit moving left, every second digit is doubled;
/// doubles above 9 have 9 subtracted; the total must be a multiple of 10.
pub fn luhn_ok(pan: &str) -> bool {
    if pan.len() < 2 {
        return false;
    }
    let mut sum = 0u32;
    let mut double = false;
    for c in pan.chars().rev() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if double {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        double = !double;
    }
    sum % 10 == 0
}

/// Compute the Luhn check digit for a PAN prefix (used by test fixtures).
pub fn luhn_check_digit(prefix: &str) -> Option<u8> {
    let mut sum = 0u32;
    let mut double = true;
    for c in prefix.chars().rev() {
        let mut digit = c.to_digit(10)?;
        if double {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        double = !double;
    }
    Some(((10 - (sum % 10)) % 10) as u8)
}

/// Mask a PAN for logs: first 4 + '*' filler + last 4.
pub fn mask_pan(pan: &str) -> String {
    if pan.len() < 8 {
        return "****".to_string();
    }
    if pan.len() == 8 {
        return format!("{}****", &pan[..4]);
    }
    format!(
        "{}{}{}",
        &pan[..4],
        "*".repeat(pan.len() - 8),
        &pan[pan.len() - 4..]
    )
}

/// Validate a PAN: strip non-digits, check length 13..=19, Luhn, brand.
pub fn validate_pan(pan: &str) -> CardValidation {
    let clean: String = pan.chars().filter(|c| c.is_ascii_digit()).collect();

    if clean.len() < 13 || clean.len() > 19 {
        return CardValidation {
            valid: false,
            luhn_ok: false,
            brand: CardBrand::Unknown,
            masked: mask_pan(&clean),
            error: Some(format!(
                "invalid PAN length: {} (must be 13-19 digits)",
                clean.len()
            )),
        };
    }

    let luhn = luhn_ok(&clean);
    let brand = detect_brand(&clean);
    let valid = luhn && brand != CardBrand::Unknown;

    let error = if !luhn {
        Some("Luhn check failed".to_string())
    } else if brand == CardBrand::Unknown {
        Some("unknown or unsupported card brand".to_string())
    } else {
        None
    };

    CardValidation {
        valid,
        luhn_ok: luhn,
        brand,
        masked: mask_pan(&clean),
        error,
    }
}
