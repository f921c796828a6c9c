//! Entry/exit signal evaluation over the last two indicator rows.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::{IndicatorRow, PositionState};

/// RSI level treated as overbought, on both sides of the trade: entries
/// require RSI below it, exits trigger on RSI above it. The asymmetry is
/// intentional.
const OVERBOUGHT_RSI: Decimal = dec!(70);

/// Why an exit fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    DownwardCross,
    StopLoss,
    TakeProfit,
    Overbought,
}

/// One trading decision per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    EnterLong,
    ExitLong { reason: ExitReason },
    Hold,
}

/// Applies the entry/exit rules to the freshest two indicator rows.
///
/// Absence of signal is the safe default: too little history or an
/// undefined indicator field yields `Hold`, never an error.
pub struct SignalEvaluator {
    stop_loss_pct: Decimal,
    take_profit_pct: Decimal,
}

impl SignalEvaluator {
    pub fn new(stop_loss_pct: Decimal, take_profit_pct: Decimal) -> Self {
        Self {
            stop_loss_pct,
            take_profit_pct,
        }
    }

    /// Evaluate the rules against the current position state.
    ///
    /// Entry and exit are mutually exclusive per cycle: flat evaluates only
    /// the entry rule, long evaluates only the exit rule.
    pub fn evaluate(&self, rows: &[IndicatorRow], state: &PositionState) -> Signal {
        let [.., prev, last] = rows else {
            return Signal::Hold;
        };

        match state {
            PositionState::Flat => self.check_entry(prev, last),
            PositionState::Long { entry_price, .. } => self.check_exit(prev, last, *entry_price),
        }
    }

    /// Entry: strict upward MA cross, RSI not overbought, close below the
    /// lower Bollinger Band. All three must hold.
    fn check_entry(&self, prev: &IndicatorRow, last: &IndicatorRow) -> Signal {
        let (Some(fast), Some(slow), Some(prev_fast), Some(prev_slow), Some(rsi), Some(bb_lower)) = (
            last.fast_ma,
            last.slow_ma,
            prev.fast_ma,
            prev.slow_ma,
            last.rsi,
            last.bb_lower,
        ) else {
            return Signal::Hold;
        };

        let crossed_up = fast > slow && prev_fast <= prev_slow;
        let not_overbought = rsi < OVERBOUGHT_RSI;
        let below_lower_band = last.close() < bb_lower;

        if crossed_up && not_overbought && below_lower_band {
            Signal::EnterLong
        } else {
            Signal::Hold
        }
    }

    /// Exit: any of a strict downward MA cross, stop-loss breach,
    /// take-profit breach, or overbought RSI.
    fn check_exit(&self, prev: &IndicatorRow, last: &IndicatorRow, entry_price: Decimal) -> Signal {
        let (Some(fast), Some(slow), Some(prev_fast), Some(prev_slow), Some(rsi)) = (
            last.fast_ma,
            last.slow_ma,
            prev.fast_ma,
            prev.slow_ma,
            last.rsi,
        ) else {
            return Signal::Hold;
        };

        let close = last.close();

        if fast < slow && prev_fast >= prev_slow {
            return Signal::ExitLong {
                reason: ExitReason::DownwardCross,
            };
        }
        if close <= entry_price * (Decimal::ONE - self.stop_loss_pct) {
            return Signal::ExitLong {
                reason: ExitReason::StopLoss,
            };
        }
        if close >= entry_price * (Decimal::ONE + self.take_profit_pct) {
            return Signal::ExitLong {
                reason: ExitReason::TakeProfit,
            };
        }
        if rsi > OVERBOUGHT_RSI {
            return Signal::ExitLong {
                reason: ExitReason::Overbought,
            };
        }

        Signal::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;
    use chrono::{TimeZone, Utc};

    fn make_row(
        close: Decimal,
        fast_ma: Option<Decimal>,
        slow_ma: Option<Decimal>,
        rsi: Option<Decimal>,
        bb_lower: Option<Decimal>,
    ) -> IndicatorRow {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        IndicatorRow {
            candle: Candle {
                open_time: ts,
                close_time: ts,
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(1),
            },
            fast_ma,
            slow_ma,
            rsi,
            bb_upper: bb_lower.map(|b| b + dec!(10)),
            bb_middle: bb_lower.map(|b| b + dec!(5)),
            bb_lower,
        }
    }

    fn evaluator() -> SignalEvaluator {
        SignalEvaluator::new(dec!(0.03), dec!(0.06))
    }

    #[test]
    fn test_entry_on_upward_cross_with_confirmations() {
        let prev = make_row(dec!(100), Some(dec!(99)), Some(dec!(100)), Some(dec!(48)), Some(dec!(96)));
        let last = make_row(dec!(95), Some(dec!(101)), Some(dec!(100)), Some(dec!(50)), Some(dec!(96)));

        let signal = evaluator().evaluate(&[prev, last], &PositionState::Flat);
        assert_eq!(signal, Signal::EnterLong);
    }

    #[test]
    fn test_overbought_rsi_blocks_entry() {
        let prev = make_row(dec!(100), Some(dec!(99)), Some(dec!(100)), Some(dec!(48)), Some(dec!(96)));
        let last = make_row(dec!(95), Some(dec!(101)), Some(dec!(100)), Some(dec!(75)), Some(dec!(96)));

        let signal = evaluator().evaluate(&[prev, last], &PositionState::Flat);
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_no_entry_without_strict_cross() {
        // Fast already above slow on both rows: no fresh cross.
        let prev = make_row(dec!(100), Some(dec!(101)), Some(dec!(100)), Some(dec!(48)), Some(dec!(101)));
        let last = make_row(dec!(95), Some(dec!(101)), Some(dec!(100)), Some(dec!(50)), Some(dec!(96)));

        let signal = evaluator().evaluate(&[prev, last], &PositionState::Flat);
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_fewer_than_two_rows_holds() {
        let last = make_row(dec!(95), Some(dec!(101)), Some(dec!(100)), Some(dec!(50)), Some(dec!(96)));

        assert_eq!(evaluator().evaluate(&[last], &PositionState::Flat), Signal::Hold);
        assert_eq!(evaluator().evaluate(&[], &PositionState::Flat), Signal::Hold);
    }

    #[test]
    fn test_undefined_fields_hold() {
        let prev = make_row(dec!(100), Some(dec!(99)), None, Some(dec!(48)), Some(dec!(96)));
        let last = make_row(dec!(95), Some(dec!(101)), Some(dec!(100)), Some(dec!(50)), Some(dec!(96)));

        let signal = evaluator().evaluate(&[prev, last], &PositionState::Flat);
        assert_eq!(signal, Signal::Hold);
    }

    fn long_at(entry: Decimal) -> PositionState {
        PositionState::Long {
            entry_price: entry,
            opened_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_stop_loss_exit() {
        // Entry at 100, 3% stop: close 96.9 breaches the 97 floor.
        let prev = make_row(dec!(100), Some(dec!(101)), Some(dec!(100)), Some(dec!(50)), None);
        let last = make_row(dec!(96.9), Some(dec!(101)), Some(dec!(100)), Some(dec!(45)), None);

        let signal = evaluator().evaluate(&[prev, last], &long_at(dec!(100)));
        assert_eq!(
            signal,
            Signal::ExitLong {
                reason: ExitReason::StopLoss
            }
        );
    }

    #[test]
    fn test_take_profit_exit() {
        // Entry at 100, 6% target: close 106.5 clears 106.
        let prev = make_row(dec!(105), Some(dec!(104)), Some(dec!(100)), Some(dec!(60)), None);
        let last = make_row(dec!(106.5), Some(dec!(105)), Some(dec!(100)), Some(dec!(60)), None);

        let signal = evaluator().evaluate(&[prev, last], &long_at(dec!(100)));
        assert_eq!(
            signal,
            Signal::ExitLong {
                reason: ExitReason::TakeProfit
            }
        );
    }

    #[test]
    fn test_downward_cross_exit() {
        let prev = make_row(dec!(100), Some(dec!(100)), Some(dec!(100)), Some(dec!(50)), None);
        let last = make_row(dec!(99), Some(dec!(99)), Some(dec!(100)), Some(dec!(45)), None);

        let signal = evaluator().evaluate(&[prev, last], &long_at(dec!(100)));
        assert_eq!(
            signal,
            Signal::ExitLong {
                reason: ExitReason::DownwardCross
            }
        );
    }

    #[test]
    fn test_overbought_exit() {
        let prev = make_row(dec!(103), Some(dec!(102)), Some(dec!(100)), Some(dec!(68)), None);
        let last = make_row(dec!(104), Some(dec!(103)), Some(dec!(100)), Some(dec!(72)), None);

        let signal = evaluator().evaluate(&[prev, last], &long_at(dec!(100)));
        assert_eq!(
            signal,
            Signal::ExitLong {
                reason: ExitReason::Overbought
            }
        );
    }

    #[test]
    fn test_long_holds_inside_bands() {
        let prev = make_row(dec!(101), Some(dec!(102)), Some(dec!(100)), Some(dec!(55)), None);
        let last = make_row(dec!(102), Some(dec!(103)), Some(dec!(100)), Some(dec!(58)), None);

        let signal = evaluator().evaluate(&[prev, last], &long_at(dec!(100)));
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_exit_not_evaluated_while_flat() {
        // A row pattern that would exit (downward cross) does nothing when flat.
        let prev = make_row(dec!(100), Some(dec!(100)), Some(dec!(100)), Some(dec!(50)), Some(dec!(90)));
        let last = make_row(dec!(99), Some(dec!(99)), Some(dec!(100)), Some(dec!(45)), Some(dec!(90)));

        let signal = evaluator().evaluate(&[prev, last], &PositionState::Flat);
        assert_eq!(signal, Signal::Hold);
    }
}
