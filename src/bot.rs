//! Bot runner: hourly scheduling around the trading cycle.
//!
//! Handles:
//! - Startup connectivity and configuration checks
//! - Running one cycle per candle close, strictly sequentially
//! - Sleeping to the next hour boundary between cycles
//! - Letting an in-flight cycle finish before shutting down on Ctrl-C
//! - Printing the performance summary at shutdown

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::api::{MarketClient, TradeClient};
use crate::error::OrderError;
use crate::metrics::PerformanceSummary;
use crate::models::{OrderFill, OrderSide};
use crate::trading::{CycleOutcome, CycleReport, OrderGateway, TradingConfig, TradingCycle};

/// Order gateway that logs intents and confirms simulated fills instead of
/// hitting the exchange.
pub struct SimulatedGateway {
    next_order_id: AtomicI64,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self {
            next_order_id: AtomicI64::new(1),
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderGateway for SimulatedGateway {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderFill, OrderError> {
        info!(
            symbol = %symbol,
            side = %side.as_str(),
            quantity = %quantity,
            "[DRY RUN] Would place market order"
        );

        Ok(OrderFill {
            order_id: self.next_order_id.fetch_add(1, Ordering::SeqCst),
            client_order_id: uuid::Uuid::new_v4().to_string(),
            executed_qty: quantity,
            avg_price: None,
        })
    }
}

/// Live or simulated order execution, selected at startup.
pub enum Gateway {
    Live(TradeClient),
    DryRun(SimulatedGateway),
}

#[async_trait]
impl OrderGateway for Gateway {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderFill, OrderError> {
        match self {
            Gateway::Live(client) => client.place_order(symbol, side, quantity).await,
            Gateway::DryRun(sim) => sim.place_order(symbol, side, quantity).await,
        }
    }
}

/// Main bot runner.
pub struct Bot {
    cycle: TradingCycle<MarketClient, TradeClient, MarketClient, Gateway>,
    account: TradeClient,
    dry_run: bool,
    shutdown: Arc<AtomicBool>,
}

impl Bot {
    /// Build the bot with live exchange collaborators.
    ///
    /// Fails fast on invalid configuration or missing credentials.
    pub fn new(config: TradingConfig, dry_run: bool) -> Result<Self> {
        config.validate().context("Invalid trading configuration")?;

        let market = MarketClient::new()?;
        let rules = MarketClient::new()?;
        let account = TradeClient::from_env()?;

        let orders = if dry_run {
            Gateway::DryRun(SimulatedGateway::new())
        } else {
            Gateway::Live(account.clone())
        };

        let cycle = TradingCycle::new(config, market, account.clone(), rules, orders);

        Ok(Self {
            cycle,
            account,
            dry_run,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get shutdown signal for external control.
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Main run loop: one cycle per candle close until shutdown.
    pub async fn run(&mut self) -> Result<()> {
        let config = self.cycle.config().clone();
        info!(
            symbol = %config.symbol,
            interval = %config.interval,
            dry_run = self.dry_run,
            "Starting trading bot"
        );
        warn!("Position state is in-memory only; a restart forgets any open position");

        self.account
            .check_connectivity()
            .await
            .context("Exchange connectivity check failed")?;

        // Register shutdown handler
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received, finishing current cycle");
            shutdown.store(true, Ordering::SeqCst);
        });

        while !self.shutdown.load(Ordering::SeqCst) {
            info!("Starting trading cycle");

            match self.cycle.run_once().await {
                Ok(report) => log_report(&report),
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Configuration is corrupt, stopping");
                    return Err(e.into());
                }
                Err(e) => {
                    // Aborted cycle: nothing was mutated, try again next candle.
                    error!(error = %e, "Cycle aborted");
                }
            }

            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            self.sleep_until_next_cycle().await;
        }

        let summary = PerformanceSummary::from_curve(self.cycle.equity());
        info!("Bot stopped");
        println!("\n{summary}");

        Ok(())
    }

    /// Sleep to the next hour boundary, waking early on shutdown.
    async fn sleep_until_next_cycle(&self) {
        let delay = delay_to_next_hour(Utc::now());
        info!(
            minutes = format!("{:.1}", delay.as_secs_f64() / 60.0),
            "Waiting for next candle close"
        );

        let deadline = tokio::time::Instant::now() + delay;
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return;
            }
            tokio::time::sleep((deadline - now).min(Duration::from_secs(1))).await;
        }
    }
}

fn log_report(report: &CycleReport) {
    match &report.outcome {
        CycleOutcome::Entered {
            quantity,
            entry_price,
            fill_price,
        } => info!(
            quantity = %quantity,
            entry_price = %entry_price,
            fill_price = ?fill_price,
            "Opened long position"
        ),
        CycleOutcome::Exited { quantity, reason } => info!(
            quantity = %quantity,
            reason = ?reason,
            "Closed long position"
        ),
        CycleOutcome::EntrySkipped => {
            warn!("Entry signal fired but sizing yielded zero quantity")
        }
        CycleOutcome::ExitSkipped => {
            warn!("Exit signal fired but there is no base balance to sell")
        }
        CycleOutcome::Held => {}
    }

    info!(
        position = if report.is_open { "OPEN" } else { "CLOSED" },
        balance = %report.quote_balance,
        "Cycle complete"
    );
}

/// Next exact hour boundary after `now`.
pub fn next_hour_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    truncated + ChronoDuration::hours(1)
}

/// Wall-clock delay from `now` to the next hour boundary.
pub fn delay_to_next_hour(now: DateTime<Utc>) -> Duration {
    (next_hour_boundary(now) - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_hour_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 13, 25, 42).unwrap();
        let next = next_hour_boundary(now);

        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_boundary_rolls_over_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();
        let next = next_hour_boundary(now);

        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_delay_is_positive_and_bounded() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 1).unwrap();
        let delay = delay_to_next_hour(now);

        assert!(delay > Duration::ZERO);
        assert!(delay <= Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_simulated_gateway_confirms_fills() {
        let gateway = SimulatedGateway::new();
        let fill = gateway
            .place_order("SOLBRL", OrderSide::Buy, rust_decimal_macros::dec!(1.5))
            .await
            .unwrap();

        assert_eq!(fill.executed_qty, rust_decimal_macros::dec!(1.5));
        assert_eq!(fill.avg_price, None);

        let second = gateway
            .place_order("SOLBRL", OrderSide::Sell, rust_decimal_macros::dec!(1.5))
            .await
            .unwrap();
        assert!(second.order_id > fill.order_id);
    }
}
