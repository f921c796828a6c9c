//! Binance market data client for public endpoints (no authentication).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::DataError;
use crate::models::Candle;
use crate::trading::{LotConstraints, MarketDataSource, SymbolRules};

use super::types::{ExchangeInfoResponse, KlineRow, SymbolFilter};

const API_BASE: &str = "https://api.binance.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long transient failures are retried before the cycle gives up.
const RETRY_MAX_ELAPSED: Duration = Duration::from_secs(60);

/// Client for Binance public market data (read-only operations).
#[derive(Clone)]
pub struct MarketClient {
    client: Client,
    base_url: String,
}

impl MarketClient {
    /// Create a new market client with default settings.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: API_BASE.to_string(),
        })
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    fn retry_policy() -> ExponentialBackoff {
        ExponentialBackoff {
            max_elapsed_time: Some(RETRY_MAX_ELAPSED),
            ..Default::default()
        }
    }

    /// GET a JSON payload, retrying transient failures with exponential
    /// backoff. Only used for idempotent reads.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DataError> {
        backoff::future::retry(Self::retry_policy(), || async move {
            let response = self.client.get(url).send().await.map_err(|e| {
                backoff::Error::transient(DataError::Unavailable(format!(
                    "request failed: {e}"
                )))
            })?;

            let status = response.status();
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataError::Unavailable(format!(
                    "server error: {status}"
                ))));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(DataError::Unavailable(format!(
                    "request failed: {status} - {body}"
                ))));
            }

            response.json::<T>().await.map_err(|e| {
                backoff::Error::permanent(DataError::Unavailable(format!(
                    "malformed response: {e}"
                )))
            })
        })
        .await
    }
}

#[async_trait]
impl MarketDataSource for MarketClient {
    async fn get_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, DataError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol,
            interval,
            limit.min(1000)
        );

        debug!(url = %url, "Fetching klines");

        let rows: Vec<KlineRow> = self.get_json(&url).await?;
        let candles = rows
            .into_iter()
            .map(parse_kline)
            .collect::<Result<Vec<_>, _>>()?;

        validate_candles(&candles)?;
        Ok(candles)
    }
}

#[async_trait]
impl SymbolRules for MarketClient {
    async fn get_lot_constraints(&self, symbol: &str) -> Result<LotConstraints, DataError> {
        let url = format!("{}/api/v3/exchangeInfo?symbol={}", self.base_url, symbol);

        debug!(url = %url, "Fetching exchange info");

        let info: ExchangeInfoResponse = self.get_json(&url).await?;
        let symbol_info = info
            .symbols
            .into_iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| DataError::Unavailable(format!("unknown symbol {symbol}")))?;

        let lot = symbol_info
            .filters
            .iter()
            .find_map(|f| match f {
                SymbolFilter::LotSize {
                    min_qty, step_size, ..
                } => Some(LotConstraints {
                    min_qty: *min_qty,
                    step_size: *step_size,
                }),
                SymbolFilter::Other => None,
            })
            .ok_or_else(|| {
                DataError::Unavailable(format!("no LOT_SIZE filter for {symbol}"))
            })?;

        if lot.min_qty <= Decimal::ZERO || lot.step_size <= Decimal::ZERO {
            return Err(DataError::Unavailable(format!(
                "degenerate lot constraints for {symbol}: min {} step {}",
                lot.min_qty, lot.step_size
            )));
        }

        Ok(lot)
    }
}

fn parse_kline(row: KlineRow) -> Result<Candle, DataError> {
    let open_time = Utc
        .timestamp_millis_opt(row.0)
        .single()
        .ok_or_else(|| DataError::Unavailable(format!("bad open time {}", row.0)))?;
    let close_time = Utc
        .timestamp_millis_opt(row.6)
        .single()
        .ok_or_else(|| DataError::Unavailable(format!("bad close time {}", row.6)))?;

    Ok(Candle {
        open_time,
        close_time,
        open: parse_decimal(&row.1, "open")?,
        high: parse_decimal(&row.2, "high")?,
        low: parse_decimal(&row.3, "low")?,
        close: parse_decimal(&row.4, "close")?,
        volume: parse_decimal(&row.5, "volume")?,
    })
}

fn parse_decimal(value: &str, field: &str) -> Result<Decimal, DataError> {
    value
        .parse::<Decimal>()
        .map_err(|e| DataError::Unavailable(format!("bad {field} value {value:?}: {e}")))
}

/// Enforce the candle-sequence contract before data reaches the core:
/// strictly increasing close times, high >= low >= 0, volume >= 0.
fn validate_candles(candles: &[Candle]) -> Result<(), DataError> {
    for pair in candles.windows(2) {
        if pair[1].close_time <= pair[0].close_time {
            return Err(DataError::Unavailable(format!(
                "klines out of order at {}",
                pair[1].close_time
            )));
        }
    }

    for candle in candles {
        if candle.high < candle.low || candle.low < Decimal::ZERO {
            return Err(DataError::Unavailable(format!(
                "invalid kline range at {}: high {} low {}",
                candle.close_time, candle.high, candle.low
            )));
        }
        if candle.volume < Decimal::ZERO {
            return Err(DataError::Unavailable(format!(
                "negative volume at {}",
                candle.close_time
            )));
        }
    }

    Ok(())
}
