//! Position state machine: flat or long, transitioned only by confirmed fills.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Current position in the traded pair.
///
/// The state lives in process memory only. A restart forgets an open
/// position; the bot surfaces this at startup rather than pretending
/// otherwise.
///
/// Callers must transition only after a confirmed order fill. A rejected or
/// unresolved order leaves the state exactly as it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionState {
    /// No position held.
    Flat,
    /// Long position in the base asset.
    Long {
        /// Last close price at decision time, not the actual fill price
        entry_price: Decimal,
        /// When the position was opened
        opened_at: DateTime<Utc>,
    },
}

impl PositionState {
    /// Whether a position is currently open.
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Long { .. })
    }

    /// Entry price, present only while long.
    pub fn entry_price(&self) -> Option<Decimal> {
        match self {
            PositionState::Flat => None,
            PositionState::Long { entry_price, .. } => Some(*entry_price),
        }
    }

    /// When the current position was opened, if any.
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        match self {
            PositionState::Flat => None,
            PositionState::Long { opened_at, .. } => Some(*opened_at),
        }
    }

    /// Record a confirmed buy fill: `Flat -> Long`.
    pub fn open_long(&mut self, entry_price: Decimal, opened_at: DateTime<Utc>) {
        *self = PositionState::Long {
            entry_price,
            opened_at,
        };
    }

    /// Record a confirmed sell fill: `Long -> Flat`.
    pub fn close_long(&mut self) {
        *self = PositionState::Flat;
    }
}

impl Default for PositionState {
    fn default() -> Self {
        PositionState::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transitions() {
        let mut state = PositionState::default();
        assert!(!state.is_open());
        assert_eq!(state.entry_price(), None);

        let opened = Utc::now();
        state.open_long(dec!(100), opened);
        assert!(state.is_open());
        assert_eq!(state.entry_price(), Some(dec!(100)));
        assert_eq!(state.opened_at(), Some(opened));

        state.close_long();
        assert!(!state.is_open());
        assert_eq!(state.entry_price(), None);
    }
}
