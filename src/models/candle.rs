//! Candle model: one OHLCV data point per fixed time interval.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV candle for a fixed time interval.
///
/// Sequences of candles are always ordered by `close_time`, strictly
/// increasing, with no duplicate timestamps. The exchange client enforces
/// this before candles reach the decision core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// When the interval opened
    pub open_time: DateTime<Utc>,

    /// When the interval closed
    pub close_time: DateTime<Utc>,

    /// Opening price
    pub open: Decimal,

    /// Highest price during the interval
    pub high: Decimal,

    /// Lowest price during the interval
    pub low: Decimal,

    /// Closing price
    pub close: Decimal,

    /// Base-asset volume traded during the interval
    pub volume: Decimal,
}

/// Candle extended with derived indicator values.
///
/// Each indicator field is `None` until enough history exists for its
/// window; absence is data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// The candle these indicators were derived from
    pub candle: Candle,

    /// Fast simple moving average of close
    pub fast_ma: Option<Decimal>,

    /// Slow simple moving average of close
    pub slow_ma: Option<Decimal>,

    /// Wilder's relative strength index, 0-100
    pub rsi: Option<Decimal>,

    /// Upper Bollinger Band
    pub bb_upper: Option<Decimal>,

    /// Middle Bollinger Band (SMA of close)
    pub bb_middle: Option<Decimal>,

    /// Lower Bollinger Band
    pub bb_lower: Option<Decimal>,
}

impl IndicatorRow {
    /// Closing price of the underlying candle.
    pub fn close(&self) -> Decimal {
        self.candle.close
    }
}
