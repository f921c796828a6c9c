//! Trading configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SizingError;

/// Configuration for the strategy, sizing, and the traded pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Trading pair symbol (e.g. "SOLBRL")
    pub symbol: String,

    /// Base asset of the pair (what we buy)
    pub base_asset: String,

    /// Quote asset of the pair (what we spend)
    pub quote_asset: String,

    /// Candle interval (e.g. "1h")
    pub interval: String,

    /// How many candles to fetch per cycle
    pub candle_limit: u32,

    /// Fraction of quote capital risked per trade (0.0 to 1.0)
    pub risk_per_trade: Decimal,

    /// Fast moving average window
    pub fast_ma_period: usize,

    /// Slow moving average window
    pub slow_ma_period: usize,

    /// RSI window
    pub rsi_period: usize,

    /// Bollinger Band window
    pub bb_period: usize,

    /// Bollinger Band width in standard deviations
    pub bb_std_multiplier: Decimal,

    /// Stop-loss distance from entry (0.0 to 1.0)
    pub stop_loss_pct: Decimal,

    /// Take-profit distance from entry (0.0 to 1.0)
    pub take_profit_pct: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: "SOLBRL".to_string(),
            base_asset: "SOL".to_string(),
            quote_asset: "BRL".to_string(),
            interval: "1h".to_string(),
            candle_limit: 1000,
            risk_per_trade: dec!(0.01),   // 1% of capital per trade
            fast_ma_period: 7,
            slow_ma_period: 40,
            rsi_period: 14,
            bb_period: 20,
            bb_std_multiplier: dec!(2),
            stop_loss_pct: dec!(0.03),    // 3%
            take_profit_pct: dec!(0.06),  // 6%
        }
    }
}

impl TradingConfig {
    /// Validate ranges. A violation means the configuration is corrupt, and
    /// trading on it would size positions nonsensically, so the caller must
    /// treat this as fatal.
    pub fn validate(&self) -> Result<(), SizingError> {
        if self.risk_per_trade <= Decimal::ZERO || self.risk_per_trade >= Decimal::ONE {
            return Err(SizingError::InvalidInput(format!(
                "risk_per_trade must be in (0, 1), got {}",
                self.risk_per_trade
            )));
        }
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct >= Decimal::ONE {
            return Err(SizingError::InvalidInput(format!(
                "stop_loss_pct must be in (0, 1), got {}",
                self.stop_loss_pct
            )));
        }
        if self.take_profit_pct <= Decimal::ZERO || self.take_profit_pct >= Decimal::ONE {
            return Err(SizingError::InvalidInput(format!(
                "take_profit_pct must be in (0, 1), got {}",
                self.take_profit_pct
            )));
        }
        if self.fast_ma_period == 0
            || self.slow_ma_period == 0
            || self.rsi_period == 0
            || self.bb_period == 0
        {
            return Err(SizingError::InvalidInput(
                "indicator periods must be positive".to_string(),
            ));
        }
        if self.fast_ma_period >= self.slow_ma_period {
            return Err(SizingError::InvalidInput(format!(
                "fast_ma_period {} must be below slow_ma_period {}",
                self.fast_ma_period, self.slow_ma_period
            )));
        }
        if self.candle_limit as usize <= self.slow_ma_period {
            return Err(SizingError::InvalidInput(format!(
                "candle_limit {} leaves no room for the slow window {}",
                self.candle_limit, self.slow_ma_period
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TradingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_risk_rejected() {
        let config = TradingConfig {
            risk_per_trade: dec!(1.5),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TradingConfig {
            risk_per_trade: Decimal::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_ma_periods_rejected() {
        let config = TradingConfig {
            fast_ma_period: 40,
            slow_ma_period: 7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
