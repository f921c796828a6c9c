//! One trading cycle: candles -> indicators -> signal -> sizing -> orders -> state.
//!
//! The cycle owns the position state and the equity curve exclusively, runs
//! its collaborators strictly in sequence, and never transitions state
//! without a confirmed fill in hand. It returns structured reports and
//! errors; logging is the caller's job.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::{CycleError, DataError, OrderError};
use crate::indicators::IndicatorEngine;
use crate::models::{Candle, EquityCurve, OrderFill, OrderSide, PositionState};

use super::{
    ExitReason, LotConstraints, PositionSizer, Signal, SignalEvaluator, TradingConfig,
};

// ==================== Collaborator contracts ====================

/// Source of candle history.
///
/// Implementations must return candles sorted ascending by close time with
/// sane OHLC invariants; the exchange client validates before handing over.
#[async_trait]
pub trait MarketDataSource {
    async fn get_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, DataError>;
}

/// Source of account balances. Unknown assets read as zero.
#[async_trait]
pub trait AccountSource {
    async fn get_balance(&self, asset: &str) -> Result<Decimal, DataError>;
}

/// Source of exchange lot constraints for a symbol.
#[async_trait]
pub trait SymbolRules {
    async fn get_lot_constraints(&self, symbol: &str) -> Result<LotConstraints, DataError>;
}

/// Order execution gateway.
///
/// `place_order` returns only once the fill is confirmed or the failure is
/// definite. An unknown outcome must surface as `OrderError::OutcomeUnknown`
/// so the cycle can refuse to guess a state transition.
#[async_trait]
pub trait OrderGateway {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderFill, OrderError>;
}

// ==================== Cycle reporting ====================

/// What a completed cycle actually did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Bought and opened a position.
    Entered {
        quantity: Decimal,
        /// Decision-time close recorded as the entry price
        entry_price: Decimal,
        /// What the exchange says we actually paid, when reported
        fill_price: Option<Decimal>,
    },
    /// Sold the full base balance and went flat.
    Exited {
        quantity: Decimal,
        reason: ExitReason,
    },
    /// Entry signal fired but sizing yielded zero quantity.
    EntrySkipped,
    /// Exit signal fired but there was no base balance to sell.
    ExitSkipped,
    /// No actionable signal.
    Held,
}

/// Structured result of one completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub signal: Signal,
    pub outcome: CycleOutcome,
    /// Free quote balance after the cycle
    pub quote_balance: Decimal,
    /// Whether a position is open after the cycle
    pub is_open: bool,
}

// ==================== The cycle runner ====================

/// Composes the decision core with injected exchange collaborators, once
/// per invocation.
pub struct TradingCycle<M, A, R, O> {
    config: TradingConfig,
    market: M,
    account: A,
    rules: R,
    orders: O,

    engine: IndicatorEngine,
    evaluator: SignalEvaluator,
    sizer: PositionSizer,

    state: PositionState,
    equity: EquityCurve,
}

impl<M, A, R, O> TradingCycle<M, A, R, O>
where
    M: MarketDataSource,
    A: AccountSource,
    R: SymbolRules,
    O: OrderGateway,
{
    pub fn new(config: TradingConfig, market: M, account: A, rules: R, orders: O) -> Self {
        let engine = IndicatorEngine::new(
            config.fast_ma_period,
            config.slow_ma_period,
            config.rsi_period,
            config.bb_period,
            config.bb_std_multiplier,
        );
        let evaluator = SignalEvaluator::new(config.stop_loss_pct, config.take_profit_pct);
        let sizer = PositionSizer::new(config.risk_per_trade, config.stop_loss_pct);

        Self {
            config,
            market,
            account,
            rules,
            orders,
            engine,
            evaluator,
            sizer,
            state: PositionState::default(),
            equity: EquityCurve::new(),
        }
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn equity(&self) -> &EquityCurve {
        &self.equity
    }

    /// Run one full cycle.
    ///
    /// An error before any order is placed aborts with nothing mutated and
    /// no equity snapshot appended. An order rejection likewise leaves the
    /// state untouched, since no fill occurred. Only a confirmed fill
    /// transitions the position.
    pub async fn run_once(&mut self) -> Result<CycleReport, CycleError> {
        let candles = self
            .market
            .get_candles(&self.config.symbol, &self.config.interval, self.config.candle_limit)
            .await?;
        let rows = self.engine.compute(&candles)?;

        let signal = self.evaluator.evaluate(&rows, &self.state);

        let outcome = match signal {
            Signal::EnterLong => {
                let last_close = rows.last().map(|r| r.close()).unwrap_or_default();
                self.try_enter(last_close).await?
            }
            Signal::ExitLong { reason } => self.try_exit(reason).await?,
            Signal::Hold => CycleOutcome::Held,
        };

        let quote_balance = self.account.get_balance(&self.config.quote_asset).await?;
        self.equity
            .record(Utc::now(), quote_balance, self.state.is_open());

        Ok(CycleReport {
            signal,
            outcome,
            quote_balance,
            is_open: self.state.is_open(),
        })
    }

    /// Size and place a buy, opening the position on a confirmed fill.
    async fn try_enter(&mut self, last_close: Decimal) -> Result<CycleOutcome, CycleError> {
        let balance = self.account.get_balance(&self.config.quote_asset).await?;
        let lot = self.rules.get_lot_constraints(&self.config.symbol).await?;

        let sizing = self.sizer.calculate(balance, last_close, &lot)?;
        if sizing.quantity.is_zero() {
            return Ok(CycleOutcome::EntrySkipped);
        }

        let fill = self
            .orders
            .place_order(&self.config.symbol, OrderSide::Buy, sizing.quantity)
            .await?;

        // Entry price is the decision-time close, not the fill price.
        self.state.open_long(last_close, Utc::now());

        Ok(CycleOutcome::Entered {
            quantity: fill.executed_qty,
            entry_price: last_close,
            fill_price: fill.avg_price,
        })
    }

    /// Sell the full base balance, going flat on a confirmed fill.
    async fn try_exit(&mut self, reason: ExitReason) -> Result<CycleOutcome, CycleError> {
        let base_balance = self.account.get_balance(&self.config.base_asset).await?;
        if base_balance <= Decimal::ZERO {
            return Ok(CycleOutcome::ExitSkipped);
        }

        let fill = self
            .orders
            .place_order(&self.config.symbol, OrderSide::Sell, base_balance)
            .await?;

        self.state.close_long();

        Ok(CycleOutcome::Exited {
            quantity: fill.executed_qty,
            reason,
        })
    }
}
