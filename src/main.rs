//! Hourly trend-following bot for a single Binance spot pair.
//!
//! Trades moving-average crossovers confirmed by RSI and Bollinger Bands,
//! sizing entries at a fixed risk fraction of available capital.

mod api;
mod bot;
mod error;
mod indicators;
mod metrics;
mod models;
mod trading;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{MarketClient, TradeClient};
use crate::bot::Bot;
use crate::indicators::IndicatorEngine;
use crate::trading::{AccountSource, MarketDataSource, TradingConfig};

/// Trend-following bot CLI.
#[derive(Parser)]
#[command(name = "trendbot")]
#[command(about = "Trade MA crossovers on a Binance spot pair", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(flatten)]
    strategy: StrategyArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Strategy parameters, overridable per flag or environment variable.
#[derive(Args)]
struct StrategyArgs {
    /// Trading pair symbol
    #[arg(long, env = "TRENDBOT_SYMBOL", default_value = "SOLBRL")]
    symbol: String,

    /// Base asset of the pair (what gets bought)
    #[arg(long, env = "TRENDBOT_BASE_ASSET", default_value = "SOL")]
    base_asset: String,

    /// Quote asset of the pair (what gets spent)
    #[arg(long, env = "TRENDBOT_QUOTE_ASSET", default_value = "BRL")]
    quote_asset: String,

    /// Candle interval
    #[arg(long, env = "TRENDBOT_INTERVAL", default_value = "1h")]
    interval: String,

    /// Candles fetched per cycle
    #[arg(long, default_value = "1000")]
    candle_limit: u32,

    /// Fraction of quote capital risked per trade
    #[arg(long, env = "TRENDBOT_RISK_PER_TRADE", default_value = "0.01")]
    risk_per_trade: Decimal,

    /// Fast moving average window
    #[arg(long, default_value = "7")]
    fast_ma_period: usize,

    /// Slow moving average window
    #[arg(long, default_value = "40")]
    slow_ma_period: usize,

    /// RSI window
    #[arg(long, default_value = "14")]
    rsi_period: usize,

    /// Bollinger Band window
    #[arg(long, default_value = "20")]
    bb_period: usize,

    /// Bollinger Band width in standard deviations
    #[arg(long, default_value = "2")]
    bb_std_multiplier: Decimal,

    /// Stop-loss distance from entry
    #[arg(long, env = "TRENDBOT_STOP_LOSS_PCT", default_value = "0.03")]
    stop_loss_pct: Decimal,

    /// Take-profit distance from entry
    #[arg(long, env = "TRENDBOT_TAKE_PROFIT_PCT", default_value = "0.06")]
    take_profit_pct: Decimal,
}

impl From<StrategyArgs> for TradingConfig {
    fn from(args: StrategyArgs) -> Self {
        Self {
            symbol: args.symbol,
            base_asset: args.base_asset,
            quote_asset: args.quote_asset,
            interval: args.interval,
            candle_limit: args.candle_limit,
            risk_per_trade: args.risk_per_trade,
            fast_ma_period: args.fast_ma_period,
            slow_ma_period: args.slow_ma_period,
            rsi_period: args.rsi_period,
            bb_period: args.bb_period,
            bb_std_multiplier: args.bb_std_multiplier,
            stop_loss_pct: args.stop_loss_pct,
            take_profit_pct: args.take_profit_pct,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the hourly trading loop
    Run {
        /// Log orders without sending them to the exchange
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch candles and print the latest indicator rows
    Indicators {
        /// How many rows to print
        #[arg(short, long, default_value = "10")]
        rows: usize,
    },

    /// Show free balances for the configured pair
    Balance,

    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config: TradingConfig = cli.strategy.into();

    match cli.command {
        Commands::Run { dry_run } => {
            let mut bot = Bot::new(config.clone(), dry_run)?;

            println!("\n=== Trendbot ===");
            println!("Pair:     {}", config.symbol);
            println!("Interval: {}", config.interval);
            println!(
                "Mode:     {}",
                if dry_run {
                    "DRY RUN (no real orders)"
                } else {
                    "LIVE TRADING"
                }
            );
            println!("\nPress Ctrl+C to stop.\n");

            bot.run().await?;
        }

        Commands::Indicators { rows } => {
            info!(symbol = %config.symbol, "Computing indicators");

            let market = MarketClient::new()?;
            let candles = market
                .get_candles(&config.symbol, &config.interval, config.candle_limit)
                .await?;

            let engine = IndicatorEngine::new(
                config.fast_ma_period,
                config.slow_ma_period,
                config.rsi_period,
                config.bb_period,
                config.bb_std_multiplier,
            );
            let indicator_rows = engine.compute(&candles)?;

            println!(
                "\n{:<22} {:>10} {:>10} {:>10} {:>8} {:>10} {:>10}",
                "CLOSE TIME", "CLOSE", "FAST MA", "SLOW MA", "RSI", "BB LOWER", "BB UPPER"
            );
            println!("{}", "-".repeat(86));

            for row in indicator_rows.iter().rev().take(rows).rev() {
                println!(
                    "{:<22} {:>10} {:>10} {:>10} {:>8} {:>10} {:>10}",
                    row.candle.close_time.format("%Y-%m-%d %H:%M"),
                    row.candle.close.round_dp(4),
                    fmt_opt(row.fast_ma),
                    fmt_opt(row.slow_ma),
                    fmt_opt(row.rsi),
                    fmt_opt(row.bb_lower),
                    fmt_opt(row.bb_upper),
                );
            }
        }

        Commands::Balance => {
            let client = TradeClient::from_env()?;

            let base = client.get_balance(&config.base_asset).await?;
            let quote = client.get_balance(&config.quote_asset).await?;

            println!("\n=== Balances ===");
            println!("{:<6} {}", config.base_asset, base);
            println!("{:<6} {}", config.quote_asset, quote);
        }

        Commands::Config => {
            config.validate()?;

            println!("\n=== Trading Configuration ===\n");
            println!("Pair:");
            println!("  Symbol:           {}", config.symbol);
            println!("  Base Asset:       {}", config.base_asset);
            println!("  Quote Asset:      {}", config.quote_asset);
            println!("  Interval:         {}", config.interval);
            println!("  Candle Limit:     {}", config.candle_limit);

            println!("\nRisk:");
            println!("  Risk per Trade:   {}%", config.risk_per_trade * Decimal::from(100));
            println!("  Stop Loss:        {}%", config.stop_loss_pct * Decimal::from(100));
            println!("  Take Profit:      {}%", config.take_profit_pct * Decimal::from(100));

            println!("\nIndicators:");
            println!("  Fast MA Period:   {}", config.fast_ma_period);
            println!("  Slow MA Period:   {}", config.slow_ma_period);
            println!("  RSI Period:       {}", config.rsi_period);
            println!("  BB Period:        {}", config.bb_period);
            println!("  BB Std Multiple:  {}", config.bb_std_multiplier);
        }
    }

    Ok(())
}

/// Format an optional indicator value, dash when undefined.
fn fmt_opt(value: Option<Decimal>) -> String {
    match value {
        Some(v) => v.round_dp(4).to_string(),
        None => "-".to_string(),
    }
}
