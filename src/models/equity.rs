//! In-memory equity curve for performance observation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time record of quote balance and position status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Free quote-asset balance after the cycle
    pub balance: Decimal,

    /// Whether a position was open at snapshot time
    pub is_open: bool,
}

/// Append-only sequence of equity snapshots.
///
/// Snapshots are never mutated after append; the only access to past points
/// is the read-only slice. Nothing here is persisted; the curve dies with
/// the process.
#[derive(Debug, Clone, Default)]
pub struct EquityCurve {
    points: Vec<EquitySnapshot>,
}

impl EquityCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one snapshot.
    pub fn record(&mut self, timestamp: DateTime<Utc>, balance: Decimal, is_open: bool) {
        self.points.push(EquitySnapshot {
            timestamp,
            balance,
            is_open,
        });
    }

    /// All snapshots, oldest first.
    pub fn points(&self) -> &[EquitySnapshot] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent snapshot, if any.
    pub fn latest(&self) -> Option<&EquitySnapshot> {
        self.points.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_append_only() {
        let mut curve = EquityCurve::new();
        assert!(curve.is_empty());

        curve.record(Utc::now(), dec!(1000), false);
        curve.record(Utc::now(), dec!(990), true);

        assert_eq!(curve.len(), 2);
        assert_eq!(curve.points()[0].balance, dec!(1000));
        assert_eq!(curve.latest().unwrap().balance, dec!(990));
        assert!(curve.latest().unwrap().is_open);
    }
}
