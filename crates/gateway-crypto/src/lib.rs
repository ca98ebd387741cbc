//! # Gateway Crypto - PIN Security Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `des` | Single DES (FIPS 46-3) | Building block for TDES |
//! | `tdes` | Two/three-key TDES, ECB | PIN block encryption, KCV |
//! | `pinblock` | ISO 9564 format 0 | PIN block encode/decode |
//! | `transposition` | Key-zone translation | Terminal key → zonal key → bank key |
//! | `cards` | Luhn + brand patterns | PAN validation and masking |
//!
//! All public interfaces speak uppercase hex strings, matching the key and
//! PIN-block representation used on the wire and in the key store. Clear PIN
//! material only ever exists inside `transposition`, in buffers that are
//! zeroized before return.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cards;
pub mod des;
pub mod errors;
pub mod pinblock;
pub mod tdes;
pub mod transposition;

pub use cards::{luhn_check_digit, validate_pan, CardBrand, CardValidation};
pub use errors::CryptoError;
pub use pinblock::{format0_decode, format0_encode};
pub use tdes::{generate_key, kcv, tdes_decrypt, tdes_encrypt};
pub use transposition::{transpose, validate_pin_block};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
