//! Risk-fraction position sizing snapped to exchange lot constraints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SizingError;

/// Exchange-imposed lot constraints for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LotConstraints {
    /// Minimum order quantity
    pub min_qty: Decimal,

    /// Quantization unit for order quantities
    pub step_size: Decimal,
}

/// Outcome of a sizing computation.
///
/// `quantity` is zero when balance or stop distance make the trade
/// unsatisfiable; the caller must treat zero as "do not trade".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingResult {
    /// Order quantity in the base asset
    pub quantity: Decimal,

    /// Quote-currency amount put at risk
    pub risk_amount: Decimal,
}

impl SizingResult {
    fn none() -> Self {
        Self {
            quantity: Decimal::ZERO,
            risk_amount: Decimal::ZERO,
        }
    }
}

/// Converts available capital and stop distance into an order quantity.
pub struct PositionSizer {
    risk_fraction: Decimal,
    stop_loss_pct: Decimal,
}

impl PositionSizer {
    pub fn new(risk_fraction: Decimal, stop_loss_pct: Decimal) -> Self {
        Self {
            risk_fraction,
            stop_loss_pct,
        }
    }

    /// Size an entry from the free quote balance and the last price.
    ///
    /// The raw quantity risks `balance * risk_fraction` against the
    /// stop-loss distance, is floored at the exchange minimum, then snapped
    /// to the nearest multiple of the step size. Nearest-multiple rounding
    /// can land slightly above the risk budget; callers relying on a hard
    /// risk ceiling should know it is approximate.
    pub fn calculate(
        &self,
        balance: Decimal,
        last_price: Decimal,
        lot: &LotConstraints,
    ) -> Result<SizingResult, SizingError> {
        if balance < Decimal::ZERO {
            return Err(SizingError::InvalidInput(format!(
                "negative balance: {balance}"
            )));
        }
        if last_price < Decimal::ZERO {
            return Err(SizingError::InvalidInput(format!(
                "negative price: {last_price}"
            )));
        }

        let stop_loss_per_unit = last_price * self.stop_loss_pct;
        if balance.is_zero() || stop_loss_per_unit.is_zero() {
            return Ok(SizingResult::none());
        }

        let risk_amount = balance * self.risk_fraction;
        let raw_quantity = risk_amount / stop_loss_per_unit;

        let quantity = raw_quantity.max(lot.min_qty);
        let quantity = (quantity / lot.step_size).round() * lot.step_size;

        Ok(SizingResult {
            quantity,
            risk_amount,
        })
    }
}
