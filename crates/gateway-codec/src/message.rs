//! ISO 8583 message model.

use std::collections::BTreeMap;
use std::fmt;

/// An ISO 8583 message: MTI plus present fields in ascending order.
///
/// Field values are stored as ASCII strings; binary fields (52, 55) carry
/// uppercase hex. Field 1 is the secondary bitmap indicator and is never
/// stored — both bitmaps are derived from field presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoMessage {
    mti: String,
    fields: BTreeMap<u8, String>,
}

impl IsoMessage {
    /// Create an empty message with the given MTI.
    pub fn new(mti: impl Into<String>) -> Self {
        Self {
            mti: mti.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Message type indicator, 4 ASCII digits.
    pub fn mti(&self) -> &str {
        &self.mti
    }

    /// Set a field value. Numbers outside 2..=128 are ignored.
    pub fn set(&mut self, number: u8, value: impl Into<String>) {
        if (2..=128).contains(&number) {
            self.fields.insert(number, value.into());
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, number: u8, value: impl Into<String>) -> Self {
        self.set(number, value);
        self
    }

    /// Field value, if present.
    pub fn get(&self, number: u8) -> Option<&str> {
        self.fields.get(&number).map(String::as_str)
    }

    /// Whether a field is present.
    pub fn has(&self, number: u8) -> bool {
        self.fields.contains_key(&number)
    }

    /// Remove a field, returning its previous value.
    pub fn remove(&mut self, number: u8) -> Option<String> {
        self.fields.remove(&number)
    }

    /// Present field numbers in ascending order.
    pub fn field_numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.fields.keys().copied()
    }

    /// Present `(number, value)` pairs in ascending order.
    pub fn fields(&self) -> impl Iterator<Item = (u8, &str)> {
        self.fields.iter().map(|(n, v)| (*n, v.as_str()))
    }

    /// Whether any field in 65..=128 is present (secondary bitmap needed).
    pub fn needs_secondary_bitmap(&self) -> bool {
        self.fields.keys().any(|n| *n >= 65)
    }

    /// Copy the listed fields from `source` where present.
    pub fn copy_fields_from(&mut self, source: &IsoMessage, numbers: &[u8]) {
        for &number in numbers {
            if let Some(value) = source.get(number) {
                self.set(number, value);
            }
        }
    }
}

impl fmt::Display for IsoMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MTI {} [", self.mti)?;
        let mut first = true;
        for number in self.fields.keys() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{number}")?;
            first = false;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_iterate_ascending() {
        let mut msg = IsoMessage::new("0200");
        msg.set(41, "TERM0001");
        msg.set(2, "4532015112830366");
        msg.set(11, "000123");
        let numbers: Vec<u8> = msg.field_numbers().collect();
        assert_eq!(numbers, vec![2, 11, 41]);
    }

    #[test]
    fn test_field_one_never_stored() {
        let mut msg = IsoMessage::new("0200");
        msg.set(1, "FFFF");
        msg.set(0, "junk");
        assert!(!msg.has(1));
        assert!(!msg.has(0));
    }

    #[test]
    fn test_secondary_bitmap_detection() {
        let mut msg = IsoMessage::new("0200");
        msg.set(64, "X");
        assert!(!msg.needs_secondary_bitmap());
        msg.set(65, "Y");
        assert!(msg.needs_secondary_bitmap());
    }

    #[test]
    fn test_copy_fields() {
        let request = IsoMessage::new("0200")
            .with(2, "4532015112830366")
            .with(4, "000000005000")
            .with(11, "000123");
        let mut response = IsoMessage::new("0210");
        response.copy_fields_from(&request, &[2, 3, 4, 11]);
        assert_eq!(response.get(2), Some("4532015112830366"));
        assert_eq!(response.get(11), Some("000123"));
        assert!(!response.has(3));
    }

    #[test]
    fn test_display_lists_fields() {
        let msg = IsoMessage::new("0800").with(3, "900000").with(41, "NEWTID01");
        assert_eq!(msg.to_string(), "MTI 0800 [3,41]");
    }
}
