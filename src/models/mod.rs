//! Domain models shared across the decision core and the exchange shell.

mod candle;
mod equity;
mod order;
mod position;

pub use candle::{Candle, IndicatorRow};
pub use equity::{EquityCurve, EquitySnapshot};
pub use order::{OrderFill, OrderSide};
pub use position::PositionState;
