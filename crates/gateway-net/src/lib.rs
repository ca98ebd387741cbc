//! # Gateway Net
//!
//! The two TCP legs of the gateway:
//!
//! - [`server::PosServer`] — inbound listener for POS terminals. One
//!   acceptor task, one session task per connection, `u16` big-endian
//!   length framing.
//! - [`bank::BankDispatcher`] — outbound client for the acquiring host.
//!   Single I/O task owning the connection, ASCII-decimal length framing,
//!   lazy reconnect with exponential backoff, (STAN, local date)
//!   correlation through [`pending::PendingStore`].

#![warn(clippy::all)]

pub mod bank;
pub mod framing;
pub mod pending;
pub mod server;

pub use bank::BankDispatcher;
pub use framing::FramingError;
pub use pending::PendingStore;
pub use server::PosServer;
