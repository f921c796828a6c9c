//! Order types shared between the decision core and the exchange gateway.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// A confirmed fill returned by the order gateway.
///
/// The core transitions position state only after receiving one of these;
/// anything short of a confirmed fill leaves the state untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFill {
    /// Exchange-assigned order id
    pub order_id: i64,

    /// Our client order id
    pub client_order_id: String,

    /// Base-asset quantity actually executed
    pub executed_qty: Decimal,

    /// Volume-weighted average fill price, when the exchange reports fills
    pub avg_price: Option<Decimal>,
}
