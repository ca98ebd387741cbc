//! # Gateway Router
//!
//! The transaction pipeline behind the POS listener:
//!
//! - [`router::TransactionRouter`] — MTI dispatch, card validation, PIN
//!   transposition, business caps, bank forwarding and response
//!   composition.
//! - [`codes`] — response-code intelligence (narration, severity, category,
//!   recommended action) for both the POS and the bank dialect.
//! - [`duplicate::DuplicateCache`] — (STAN, local date) replay detection.
//! - [`ports::BankDispatch`] — outbound port implemented by the bank
//!   dispatcher.

#![warn(clippy::all)]

pub mod codes;
pub mod duplicate;
pub mod ports;
pub mod router;

pub use codes::{bank_code_info, pos_code_info, Category, CodeInfo, Severity};
pub use duplicate::DuplicateCache;
pub use ports::{BankDispatch, DispatchError};
pub use router::TransactionRouter;
