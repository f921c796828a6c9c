//! Trading logic: configuration, signal evaluation, sizing, and the cycle.

mod config;
mod cycle;
mod signal;
mod sizer;

pub use config::TradingConfig;
pub use cycle::{
    AccountSource, CycleOutcome, CycleReport, MarketDataSource, OrderGateway, SymbolRules,
    TradingCycle,
};
pub use signal::{ExitReason, Signal, SignalEvaluator};
pub use sizer::{LotConstraints, PositionSizer, SizingResult};
