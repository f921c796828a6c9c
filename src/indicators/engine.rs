//! Indicator engine: SMA, Wilder RSI, and Bollinger Bands over a close series.
//!
//! Pure transformation: same-length output, no side effects, and a field
//! stays `None` until its window is populated. Calling it twice on the same
//! input yields identical output.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::error::IndicatorError;
use crate::models::{Candle, IndicatorRow};

/// Computes indicator rows from an ordered candle sequence.
pub struct IndicatorEngine {
    fast_ma_period: usize,
    slow_ma_period: usize,
    rsi_period: usize,
    bb_period: usize,
    bb_std_multiplier: Decimal,
}

impl IndicatorEngine {
    pub fn new(
        fast_ma_period: usize,
        slow_ma_period: usize,
        rsi_period: usize,
        bb_period: usize,
        bb_std_multiplier: Decimal,
    ) -> Self {
        Self {
            fast_ma_period,
            slow_ma_period,
            rsi_period,
            bb_period,
            bb_std_multiplier,
        }
    }

    /// Derive one `IndicatorRow` per input candle.
    ///
    /// Fields with a window of size `w` are defined from index `w - 1`
    /// onward; RSI needs a prior close per delta, so its first value lands
    /// at index `rsi_period`.
    pub fn compute(&self, candles: &[Candle]) -> Result<Vec<IndicatorRow>, IndicatorError> {
        if candles.is_empty() {
            return Err(IndicatorError::InsufficientData);
        }

        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();

        let fast_ma = sma(&closes, self.fast_ma_period);
        let slow_ma = sma(&closes, self.slow_ma_period);
        let rsi = wilder_rsi(&closes, self.rsi_period);
        let (bb_upper, bb_middle, bb_lower) =
            bollinger(&closes, self.bb_period, self.bb_std_multiplier);

        let rows = candles
            .iter()
            .enumerate()
            .map(|(i, candle)| IndicatorRow {
                candle: candle.clone(),
                fast_ma: fast_ma[i],
                slow_ma: slow_ma[i],
                rsi: rsi[i],
                bb_upper: bb_upper[i],
                bb_middle: bb_middle[i],
                bb_lower: bb_lower[i],
            })
            .collect();

        Ok(rows)
    }
}

/// Simple moving average over `period` closes.
fn sma(closes: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period {
        return out;
    }

    let divisor = Decimal::from(period as u64);
    let mut sum = Decimal::ZERO;

    for (i, close) in closes.iter().enumerate() {
        sum += close;
        if i >= period {
            sum -= closes[i - period];
        }
        if i + 1 >= period {
            out[i] = Some(sum / divisor);
        }
    }

    out
}

/// Wilder's RSI: seed with the simple mean of the first `period` deltas,
/// then smooth with `avg = (prev * (period - 1) + current) / period`.
fn wilder_rsi(closes: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let divisor = Decimal::from(period as u64);
    let mut avg_gain = Decimal::ZERO;
    let mut avg_loss = Decimal::ZERO;

    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > Decimal::ZERO {
            avg_gain += change;
        } else {
            avg_loss += -change;
        }
    }
    avg_gain /= divisor;
    avg_loss /= divisor;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in period + 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change > Decimal::ZERO {
            (change, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -change)
        };

        avg_gain = (avg_gain * (divisor - Decimal::ONE) + gain) / divisor;
        avg_loss = (avg_loss * (divisor - Decimal::ONE) + loss) / divisor;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    out
}

fn rsi_value(avg_gain: Decimal, avg_loss: Decimal) -> Decimal {
    if avg_loss.is_zero() {
        return dec!(100);
    }
    let rs = avg_gain / avg_loss;
    dec!(100) - dec!(100) / (Decimal::ONE + rs)
}

/// Bollinger Bands: SMA middle, upper/lower at `multiplier` population
/// standard deviations over the same window.
#[allow(clippy::type_complexity)]
fn bollinger(
    closes: &[Decimal],
    period: usize,
    multiplier: Decimal,
) -> (
    Vec<Option<Decimal>>,
    Vec<Option<Decimal>>,
    Vec<Option<Decimal>>,
) {
    let middle = sma(closes, period);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];

    if period == 0 {
        return (upper, middle, lower);
    }

    let divisor = Decimal::from(period as u64);

    for i in 0..closes.len() {
        let Some(mean) = middle[i] else {
            continue;
        };

        let window = &closes[i + 1 - period..=i];
        let variance = window
            .iter()
            .map(|c| (c - mean) * (c - mean))
            .sum::<Decimal>()
            / divisor;
        let std_dev = variance.sqrt().unwrap_or_default();

        upper[i] = Some(mean + multiplier * std_dev);
        lower[i] = Some(mean - multiplier * std_dev);
    }

    (upper, middle, lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_candles(closes: &[Decimal]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                open_time: start + Duration::hours(i as i64),
                close_time: start + Duration::hours(i as i64 + 1),
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(1),
            })
            .collect()
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let engine = IndicatorEngine::new(7, 40, 14, 20, dec!(2));
        assert_eq!(
            engine.compute(&[]).unwrap_err(),
            IndicatorError::InsufficientData
        );
    }

    #[test]
    fn test_output_length_and_definedness() {
        let closes: Vec<Decimal> = (1..=10).map(Decimal::from).collect();
        let candles = make_candles(&closes);

        let engine = IndicatorEngine::new(3, 5, 3, 4, dec!(2));
        let rows = engine.compute(&candles).unwrap();

        assert_eq!(rows.len(), candles.len());

        // SMA and Bollinger fields turn on at window - 1.
        assert!(rows[1].fast_ma.is_none());
        assert!(rows[2].fast_ma.is_some());
        assert!(rows[3].slow_ma.is_none());
        assert!(rows[4].slow_ma.is_some());
        assert!(rows[2].bb_middle.is_none());
        assert!(rows[3].bb_middle.is_some());
        assert!(rows[3].bb_upper.is_some());
        assert!(rows[3].bb_lower.is_some());

        // RSI needs a prior close per delta: first value at index = period.
        assert!(rows[2].rsi.is_none());
        assert!(rows[3].rsi.is_some());
    }

    #[test]
    fn test_sma_values() {
        let closes: Vec<Decimal> = (1..=5).map(Decimal::from).collect();
        let out = sma(&closes, 3);

        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(dec!(2)));
        assert_eq!(out[3], Some(dec!(3)));
        assert_eq!(out[4], Some(dec!(4)));
    }

    #[test]
    fn test_rsi_all_gains_reads_100() {
        let closes: Vec<Decimal> = (1..=6).map(Decimal::from).collect();
        let out = wilder_rsi(&closes, 3);

        assert_eq!(out[2], None);
        assert_eq!(out[3], Some(dec!(100)));
        assert_eq!(out[5], Some(dec!(100)));
    }

    #[test]
    fn test_rsi_wilder_smoothing() {
        let closes = vec![dec!(10), dec!(11), dec!(10.5), dec!(11.5)];
        let out = wilder_rsi(&closes, 2);

        // Seed: avg_gain = 0.5, avg_loss = 0.25 -> rs = 2 -> rsi = 66.67
        assert_eq!(out[2].unwrap().round_dp(2), dec!(66.67));
        // Next delta +1: avg_gain = 0.75, avg_loss = 0.125 -> rs = 6 -> 85.71
        assert_eq!(out[3].unwrap().round_dp(2), dec!(85.71));
    }

    #[test]
    fn test_bollinger_bands() {
        let closes = vec![dec!(2), dec!(4)];
        let (upper, middle, lower) = bollinger(&closes, 2, dec!(2));

        // mean 3, population std dev 1
        assert_eq!(middle[1], Some(dec!(3)));
        assert_eq!(upper[1], Some(dec!(5)));
        assert_eq!(lower[1], Some(dec!(1)));
    }

    #[test]
    fn test_compute_is_idempotent() {
        let closes: Vec<Decimal> = (1..=50).map(|i| Decimal::from(i * 7 % 13 + 100)).collect();
        let candles = make_candles(&closes);
        let engine = IndicatorEngine::new(7, 40, 14, 20, dec!(2));

        let first = engine.compute(&candles).unwrap();
        let second = engine.compute(&candles).unwrap();
        assert_eq!(first, second);
    }
}
