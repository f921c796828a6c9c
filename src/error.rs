//! Error taxonomy for the decision core and its collaborators.
//!
//! The split matters for propagation policy: indicator and data failures
//! abort a single cycle and the loop keeps running; a sizing error means the
//! configuration is corrupt and the process must stop; an order whose fill
//! status is unknown must never be resolved by guessing.

use thiserror::Error;

/// Indicator computation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndicatorError {
    /// Not enough candle history to derive anything.
    #[error("insufficient data: candle history is empty")]
    InsufficientData,
}

/// Collaborator I/O failures when reading market or account data.
#[derive(Debug, Error)]
pub enum DataError {
    /// Transport or API failure; the cycle aborts and is reported.
    #[error("data unavailable: {0}")]
    Unavailable(String),
}

/// Invalid inputs to position sizing.
///
/// Negative balances or prices cannot come from the exchange; they indicate
/// corrupted configuration and are fatal to the process.
#[derive(Debug, Error)]
pub enum SizingError {
    #[error("invalid sizing input: {0}")]
    InvalidInput(String),
}

/// Order placement failures.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The exchange declined the order. No fill occurred, so position state
    /// is unchanged.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// The request was sent but the fill status could not be determined.
    /// The caller must not transition position state on this.
    #[error("order outcome unknown: {0}")]
    OutcomeUnknown(String),
}

/// Everything a single trading cycle can fail with.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Sizing(#[from] SizingError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

impl CycleError {
    /// Whether this error means the process should stop rather than retry
    /// next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CycleError::Sizing(_))
    }
}
