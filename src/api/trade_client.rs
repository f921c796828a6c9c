//! Binance account and order client for signed endpoints.
//!
//! Requests are authenticated with an HMAC-SHA256 signature over the query
//! string plus an `X-MBX-APIKEY` header. Reads retry with backoff; order
//! placement never does, because a request that dies in flight has an
//! unknown fill status and must be reported as such, not replayed.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use sha2::Sha256;
use tracing::{debug, info};

use crate::error::{DataError, OrderError};
use crate::models::{OrderFill, OrderSide};
use crate::trading::{AccountSource, OrderGateway};

use super::types::{AccountResponse, ApiError, OrderResponse};

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.binance.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_MAX_ELAPSED: Duration = Duration::from_secs(60);
const RECV_WINDOW_MS: u64 = 5_000;

/// Client for signed Binance endpoints: balances and order execution.
#[derive(Clone)]
pub struct TradeClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl TradeClient {
    /// Build from `BINANCE_API_KEY` / `BINANCE_API_SECRET` in the
    /// environment (or a `.env` file loaded by the caller).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("BINANCE_API_KEY")
            .context("BINANCE_API_KEY not set")?;
        let api_secret = std::env::var("BINANCE_API_SECRET")
            .context("BINANCE_API_SECRET not set")?;

        Self::new(api_key, api_secret)
    }

    pub fn new(api_key: String, api_secret: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: API_BASE.to_string(),
            api_key,
            api_secret,
        })
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(api_key: String, api_secret: String, base_url: String) -> Result<Self> {
        let mut client = Self::new(api_key, api_secret)?;
        client.base_url = base_url;
        Ok(client)
    }

    /// Verify credentials and connectivity before the first cycle.
    pub async fn check_connectivity(&self) -> Result<(), DataError> {
        self.get_account().await?;
        info!("Exchange connection established");
        Ok(())
    }

    /// Fetch the full account snapshot.
    pub async fn get_account(&self) -> Result<AccountResponse, DataError> {
        self.signed_get("/api/v3/account", String::new()).await
    }

    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn stamp(query: String) -> String {
        let timestamp = Utc::now().timestamp_millis();
        if query.is_empty() {
            format!("timestamp={timestamp}&recvWindow={RECV_WINDOW_MS}")
        } else {
            format!("{query}&timestamp={timestamp}&recvWindow={RECV_WINDOW_MS}")
        }
    }

    fn retry_policy() -> ExponentialBackoff {
        ExponentialBackoff {
            max_elapsed_time: Some(RETRY_MAX_ELAPSED),
            ..Default::default()
        }
    }

    /// Signed GET with retry; the signature is rebuilt per attempt so the
    /// timestamp stays inside the receive window.
    async fn signed_get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: String,
    ) -> Result<T, DataError> {
        backoff::future::retry(Self::retry_policy(), || {
            let query = query.clone();
            async move {
                let query = Self::stamp(query);
                let signature = self.sign(&query);
                let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

                debug!(path = %path, "Signed GET");

                let response = self
                    .client
                    .get(&url)
                    .header("X-MBX-APIKEY", &self.api_key)
                    .send()
                    .await
                    .map_err(|e| {
                        backoff::Error::transient(DataError::Unavailable(format!(
                            "request failed: {e}"
                        )))
                    })?;

                let status = response.status();
                if status.is_server_error() {
                    return Err(backoff::Error::transient(DataError::Unavailable(
                        format!("server error: {status}"),
                    )));
                }
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(backoff::Error::permanent(DataError::Unavailable(
                        format!("request failed: {status} - {body}"),
                    )));
                }

                response.json::<T>().await.map_err(|e| {
                    backoff::Error::permanent(DataError::Unavailable(format!(
                        "malformed response: {e}"
                    )))
                })
            }
        })
        .await
    }
}

#[async_trait]
impl AccountSource for TradeClient {
    async fn get_balance(&self, asset: &str) -> Result<Decimal, DataError> {
        let account = self.get_account().await?;

        Ok(account
            .balances
            .iter()
            .find(|b| b.asset == asset)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO))
    }
}

#[async_trait]
impl OrderGateway for TradeClient {
    /// Place an at-market order and wait for the definitive outcome.
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderFill, OrderError> {
        let client_order_id = uuid::Uuid::new_v4().to_string();
        let query = Self::stamp(format!(
            "symbol={symbol}&side={}&type=MARKET&quantity={quantity}&newClientOrderId={client_order_id}&newOrderRespType=FULL",
            side.as_str()
        ));
        let signature = self.sign(&query);
        let url = format!(
            "{}/api/v3/order?{}&signature={}",
            self.base_url, query, signature
        );

        info!(
            symbol = %symbol,
            side = %side.as_str(),
            quantity = %quantity,
            "Placing market order"
        );

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                OrderError::OutcomeUnknown(format!("order request died in flight: {e}"))
            })?;

        let status = response.status();
        if status.is_server_error() {
            // The exchange may or may not have processed the order.
            let body = response.text().await.unwrap_or_default();
            return Err(OrderError::OutcomeUnknown(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| format!("{} (code {})", e.msg, e.code))
                .unwrap_or(body);
            return Err(OrderError::Rejected(format!("{status}: {message}")));
        }

        let order: OrderResponse = response.json().await.map_err(|e| {
            OrderError::OutcomeUnknown(format!("unreadable order response: {e}"))
        })?;

        match order.status.as_str() {
            "FILLED" => {
                let avg_price = average_fill_price(&order);
                Ok(OrderFill {
                    order_id: order.order_id,
                    client_order_id: order.client_order_id,
                    executed_qty: order.executed_qty,
                    avg_price,
                })
            }
            "EXPIRED" | "REJECTED" => Err(OrderError::Rejected(format!(
                "order {} ended {}",
                order.order_id, order.status
            ))),
            other => Err(OrderError::OutcomeUnknown(format!(
                "order {} left in state {}",
                order.order_id, other
            ))),
        }
    }
}

/// Volume-weighted average over the reported fills, if any.
fn average_fill_price(order: &OrderResponse) -> Option<Decimal> {
    let total_qty: Decimal = order.fills.iter().map(|f| f.qty).sum();
    if total_qty.is_zero() {
        return None;
    }

    let total_quote: Decimal = order.fills.iter().map(|f| f.price * f.qty).sum();
    Some(total_quote / total_qty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signature_matches_binance_documented_vector() {
        let client = TradeClient::new(
            "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A".to_string(),
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".to_string(),
        )
        .unwrap();

        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            client.sign(query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_average_fill_price() {
        let json = r#"{
            "symbol": "SOLBRL",
            "orderId": 12345,
            "clientOrderId": "abc",
            "status": "FILLED",
            "executedQty": "3",
            "cummulativeQuoteQty": "310",
            "fills": [
                {"price": "100", "qty": "2", "commission": "0", "commissionAsset": "BRL"},
                {"price": "110", "qty": "1", "commission": "0", "commissionAsset": "BRL"}
            ]
        }"#;

        let order: OrderResponse = serde_json::from_str(json).unwrap();
        // (200 + 110) / 3
        assert_eq!(
            average_fill_price(&order).unwrap().round_dp(2),
            dec!(103.33)
        );
    }

    #[test]
    fn test_average_fill_price_without_fills() {
        let json = r#"{
            "symbol": "SOLBRL",
            "orderId": 12345,
            "clientOrderId": "abc",
            "status": "FILLED",
            "executedQty": "3",
            "cummulativeQuoteQty": "310",
            "fills": []
        }"#;

        let order: OrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(average_fill_price(&order), None);
    }
}
