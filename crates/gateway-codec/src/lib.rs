//! # Gateway Codec - ISO 8583
//!
//! Message model, field dictionaries and the pack/unpack algorithms for the
//! two dialects the gateway speaks:
//!
//! | Dictionary | Bitmap | Direction |
//! |------------|--------|-----------|
//! | POS | ASCII hex (16/32 chars) | terminal-facing |
//! | Bank | binary (8/16 bytes) | bank-facing, selected numerics packed BCD |
//!
//! An [`IsoMessage`] is the MTI plus an ordered map of present fields; the
//! bitmap is never stored, it is derived at pack time and consumed at unpack
//! time, so the fields-vs-bitmap invariant cannot be violated by
//! construction.

#![warn(clippy::all)]

pub mod bcd;
pub mod codec;
pub mod dictionary;
pub mod errors;
pub mod field;
pub mod message;

pub use codec::{pack, unpack};
pub use dictionary::{bank_dictionary, pos_dictionary, BitmapForm, Dictionary};
pub use errors::CodecError;
pub use field::{FieldDef, FieldKind};
pub use message::IsoMessage;
