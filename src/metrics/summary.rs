//! Summary statistics computed from equity snapshots: return, max drawdown,
//! Sharpe ratio.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use statrs::statistics::Statistics;

use crate::models::EquityCurve;

/// Hourly cycles per year, for annualizing the Sharpe ratio.
const CYCLES_PER_YEAR: f64 = 24.0 * 365.0;

/// Performance figures derived from the equity curve at shutdown.
#[derive(Debug, Clone)]
pub struct PerformanceSummary {
    /// Number of recorded snapshots
    pub snapshots: usize,

    /// Quote balance at the first snapshot
    pub initial_balance: Decimal,

    /// Quote balance at the last snapshot
    pub final_balance: Decimal,

    /// Total return over the run (fraction, can be negative)
    pub total_return: f64,

    /// Maximum peak-to-trough drawdown on the balance series (0.0 to 1.0)
    pub max_drawdown: f64,

    /// Annualized Sharpe ratio over per-cycle returns, 0 risk-free rate
    pub sharpe_ratio: f64,

    /// How many snapshots were taken with a position open
    pub cycles_in_position: usize,
}

impl PerformanceSummary {
    /// Compute a summary from the curve. Degenerate curves (fewer than two
    /// points, zero balances) produce zeroed ratios rather than errors.
    pub fn from_curve(curve: &EquityCurve) -> Self {
        let points = curve.points();

        let initial_balance = points.first().map(|p| p.balance).unwrap_or(Decimal::ZERO);
        let final_balance = points.last().map(|p| p.balance).unwrap_or(Decimal::ZERO);
        let cycles_in_position = points.iter().filter(|p| p.is_open).count();

        let total_return = if initial_balance > Decimal::ZERO {
            ((final_balance - initial_balance) / initial_balance)
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };

        Self {
            snapshots: points.len(),
            initial_balance,
            final_balance,
            total_return,
            max_drawdown: Self::max_drawdown(curve),
            sharpe_ratio: Self::sharpe(curve),
            cycles_in_position,
        }
    }

    /// Largest peak-to-trough decline as a fraction of the peak.
    fn max_drawdown(curve: &EquityCurve) -> f64 {
        let mut peak = Decimal::ZERO;
        let mut max_dd = 0.0f64;

        for point in curve.points() {
            if point.balance > peak {
                peak = point.balance;
            }

            if peak > Decimal::ZERO {
                let dd = ((peak - point.balance) / peak).to_f64().unwrap_or(0.0);
                if dd > max_dd {
                    max_dd = dd;
                }
            }
        }

        max_dd
    }

    /// Annualized Sharpe ratio over per-cycle returns, assuming hourly
    /// cycles and a 0% risk-free rate.
    fn sharpe(curve: &EquityCurve) -> f64 {
        let points = curve.points();
        if points.len() < 2 {
            return 0.0;
        }

        let returns: Vec<f64> = points
            .windows(2)
            .filter_map(|pair| {
                let prev = pair[0].balance;
                let current = pair[1].balance;
                if prev > Decimal::ZERO {
                    ((current - prev) / prev).to_f64()
                } else {
                    None
                }
            })
            .collect();

        if returns.len() < 2 {
            return 0.0;
        }

        let mean = returns.clone().mean();
        let std_dev = returns.std_dev();

        if std_dev > 0.0 {
            (mean / std_dev) * CYCLES_PER_YEAR.sqrt()
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Performance Summary ===")?;
        writeln!(f, "Snapshots:        {}", self.snapshots)?;
        writeln!(f, "Initial Balance:  {:.2}", self.initial_balance)?;
        writeln!(f, "Final Balance:    {:.2}", self.final_balance)?;
        writeln!(f, "Total Return:     {:.2}%", self.total_return * 100.0)?;
        writeln!(f, "Max Drawdown:     {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "Sharpe Ratio:     {:.2}", self.sharpe_ratio)?;
        writeln!(
            f,
            "Cycles in Position: {} of {}",
            self.cycles_in_position, self.snapshots
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn curve_from(balances: &[Decimal]) -> EquityCurve {
        let mut curve = EquityCurve::new();
        for &balance in balances {
            curve.record(Utc::now(), balance, false);
        }
        curve
    }

    #[test]
    fn test_empty_curve_is_zeroed() {
        let summary = PerformanceSummary::from_curve(&EquityCurve::new());

        assert_eq!(summary.snapshots, 0);
        assert_eq!(summary.total_return, 0.0);
        assert_eq!(summary.max_drawdown, 0.0);
        assert_eq!(summary.sharpe_ratio, 0.0);
    }

    #[test]
    fn test_total_return() {
        let curve = curve_from(&[dec!(1000), dec!(1100)]);
        let summary = PerformanceSummary::from_curve(&curve);

        assert!((summary.total_return - 0.10).abs() < 1e-9);
        assert_eq!(summary.initial_balance, dec!(1000));
        assert_eq!(summary.final_balance, dec!(1100));
    }

    #[test]
    fn test_max_drawdown() {
        // Peak 150, trough 50: two-thirds drawdown.
        let curve = curve_from(&[
            dec!(100),
            dec!(150),
            dec!(70),
            dec!(50),
            dec!(150),
            dec!(200),
        ]);
        let summary = PerformanceSummary::from_curve(&curve);

        assert!(summary.max_drawdown > 0.65 && summary.max_drawdown < 0.68);
    }

    #[test]
    fn test_flat_curve_has_zero_sharpe() {
        let curve = curve_from(&[dec!(1000), dec!(1000), dec!(1000)]);
        let summary = PerformanceSummary::from_curve(&curve);

        assert_eq!(summary.sharpe_ratio, 0.0);
    }
}
