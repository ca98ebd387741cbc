//! Outbound port to the bank dispatcher.

use async_trait::async_trait;
use gateway_codec::IsoMessage;
use thiserror::Error;

/// Failures surfaced by the bank leg.
///
/// The POS caller never sees these directly; the router collapses all of
/// them to response code 91.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No response within the per-request deadline.
    #[error("bank timeout")]
    Timeout,

    /// Connection could not be established or broke mid-exchange.
    #[error("bank connection failed: {0}")]
    Connection(String),

    /// The bank message could not be packed or the response unpacked.
    #[error("bank codec failure: {0}")]
    Codec(String),

    /// Dispatcher is shutting down.
    #[error("bank dispatcher unavailable")]
    Unavailable,
}

/// Submit a POS-dialect message for forwarding to the bank.
///
/// Implementations translate to the bank dialect, transpose PIN material to
/// the bank key zone, correlate the response by (STAN, local date) and
/// enforce the request deadline.
#[async_trait]
pub trait BankDispatch: Send + Sync {
    /// Forward and await the correlated bank response.
    async fn submit(&self, msg: IsoMessage) -> Result<IsoMessage, DispatchError>;
}
