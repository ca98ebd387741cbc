//! The POS and Bank field dictionaries.
//!
//! Both dialects share field semantics; they differ in bitmap form (POS
//! emits ASCII hex, the bank leg emits raw bytes) and in the bank dialect
//! packing fields 3 and 11 as BCD. The tables below are normative — there is
//! no fallback packager.

use crate::field::{FieldDef, FieldKind};

/// How a dictionary encodes its bitmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapForm {
    /// 16 ASCII hex chars per bitmap.
    AsciiHex,
    /// 8 raw bytes per bitmap.
    Binary,
}

/// A field dictionary for one dialect.
#[derive(Debug)]
pub struct Dictionary {
    /// Dialect name, for logs and errors.
    pub name: &'static str,
    /// Bitmap encoding.
    pub bitmap: BitmapForm,
    fields: &'static [FieldDef],
}

impl Dictionary {
    /// Look up the entry for a field number.
    pub fn field(&self, number: u8) -> Option<&FieldDef> {
        self.fields.iter().find(|def| def.number == number)
    }
}

use FieldKind::{FixedBinary, FixedChar, FixedNumeric, LlNum, LllBinary, LllChar};

const POS_FIELDS: &[FieldDef] = &[
    FieldDef::var(2, "Primary Account Number", LlNum, 19),
    FieldDef::fixed(3, "Processing Code", FixedNumeric, 6),
    FieldDef::fixed(4, "Amount, Transaction", FixedNumeric, 12),
    FieldDef::fixed(7, "Transmission Date and Time", FixedNumeric, 10),
    FieldDef::fixed(11, "System Trace Audit Number", FixedNumeric, 6),
    FieldDef::fixed(12, "Time, Local Transaction", FixedNumeric, 6),
    FieldDef::fixed(13, "Date, Local Transaction", FixedNumeric, 4),
    FieldDef::fixed(14, "Date, Expiration", FixedNumeric, 4),
    FieldDef::fixed(22, "POS Entry Mode", FixedNumeric, 3),
    FieldDef::fixed(25, "POS Condition Code", FixedNumeric, 2),
    FieldDef::var(35, "Track 2 Data", LlNum, 37),
    FieldDef::fixed(37, "Retrieval Reference Number", FixedChar, 12),
    FieldDef::fixed(38, "Authorization Code", FixedChar, 6),
    FieldDef::fixed(39, "Response Code", FixedChar, 2),
    FieldDef::fixed(41, "Card Acceptor Terminal ID", FixedChar, 8),
    FieldDef::fixed(42, "Card Acceptor ID", FixedChar, 15),
    FieldDef::fixed(43, "Card Acceptor Name/Location", FixedChar, 40),
    FieldDef::fixed(49, "Currency Code, Transaction", FixedChar, 3),
    FieldDef::fixed(52, "PIN Data", FixedBinary, 8),
    FieldDef::var(53, "Security Related Control Information", LllChar, 48),
    FieldDef::var(55, "ICC Data", LllBinary, 255),
    FieldDef::fixed(90, "Original Data Elements", FixedChar, 42),
    FieldDef::var(120, "Additional POS Data", LllChar, 999),
    FieldDef::var(126, "Private Use", LllChar, 999),
];

// Track 2 is alphanumeric on the bank leg in practice (separator 'D'), but
// both dialects carry it behind an LL header; the POS table above keeps the
// source's LL-num declaration and tolerates track separators at validation.
const BANK_FIELDS: &[FieldDef] = &[
    FieldDef::var(2, "Primary Account Number", LlNum, 19),
    FieldDef::fixed(3, "Processing Code", FixedNumeric, 6).packed(),
    FieldDef::fixed(4, "Amount, Transaction", FixedNumeric, 12),
    FieldDef::fixed(7, "Transmission Date and Time", FixedNumeric, 10),
    FieldDef::fixed(11, "System Trace Audit Number", FixedNumeric, 6).packed(),
    FieldDef::fixed(12, "Time, Local Transaction", FixedNumeric, 6),
    FieldDef::fixed(13, "Date, Local Transaction", FixedNumeric, 4),
    FieldDef::fixed(14, "Date, Expiration", FixedNumeric, 4),
    FieldDef::fixed(22, "POS Entry Mode", FixedNumeric, 3),
    FieldDef::fixed(25, "POS Condition Code", FixedNumeric, 2),
    FieldDef::var(35, "Track 2 Data", LlNum, 37),
    FieldDef::fixed(37, "Retrieval Reference Number", FixedChar, 12),
    FieldDef::fixed(38, "Authorization Code", FixedChar, 6),
    FieldDef::fixed(39, "Response Code", FixedChar, 2),
    FieldDef::fixed(41, "Card Acceptor Terminal ID", FixedChar, 8),
    FieldDef::fixed(42, "Card Acceptor ID", FixedChar, 15),
    FieldDef::fixed(43, "Card Acceptor Name/Location", FixedChar, 40),
    FieldDef::fixed(49, "Currency Code, Transaction", FixedChar, 3),
    FieldDef::fixed(52, "PIN Data", FixedBinary, 8),
    FieldDef::var(53, "Security Related Control Information", LllChar, 48),
    FieldDef::var(55, "ICC Data", LllBinary, 255),
    FieldDef::fixed(90, "Original Data Elements", FixedChar, 42),
    FieldDef::var(120, "Additional POS Data", LllChar, 999),
    FieldDef::var(126, "Private Use", LllChar, 999),
];

static POS: Dictionary = Dictionary {
    name: "POS",
    bitmap: BitmapForm::AsciiHex,
    fields: POS_FIELDS,
};

static BANK: Dictionary = Dictionary {
    name: "BANK",
    bitmap: BitmapForm::Binary,
    fields: BANK_FIELDS,
};

/// Terminal-facing dictionary.
pub fn pos_dictionary() -> &'static Dictionary {
    &POS
}

/// Bank-facing dictionary.
pub fn bank_dictionary() -> &'static Dictionary {
    &BANK
}
