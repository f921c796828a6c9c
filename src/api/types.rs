//! Wire types for the Binance REST API.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Raw kline row from `/api/v3/klines`.
///
/// Binance returns a heterogeneous JSON array per candle: timestamps as
/// integers, prices and volumes as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct KlineRow(
    pub i64,    // open time (ms)
    pub String, // open
    pub String, // high
    pub String, // low
    pub String, // close
    pub String, // volume
    pub i64,    // close time (ms)
    pub String, // quote asset volume
    pub i64,    // number of trades
    pub String, // taker buy base volume
    pub String, // taker buy quote volume
    pub String, // unused
);

/// Account snapshot from `/api/v3/account`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    pub balances: Vec<BalanceEntry>,
}

/// One asset balance within the account snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceEntry {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// Response from `/api/v3/exchangeInfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

/// Per-symbol trading rules.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// Symbol filter, discriminated by `filterType`. Only the lot-size filter
/// matters here; everything else parses as `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        min_qty: Decimal,
        max_qty: Decimal,
        step_size: Decimal,
    },
    #[serde(other)]
    Other,
}

/// Response from `POST /api/v3/order` with `newOrderRespType=FULL`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: i64,
    pub client_order_id: String,
    pub status: String,
    #[serde(default)]
    pub executed_qty: Decimal,
    /// Binance's spelling, kept verbatim for the rename to line up
    #[serde(default)]
    pub cummulative_quote_qty: Decimal,
    #[serde(default)]
    pub fills: Vec<OrderFillEntry>,
}

/// One partial fill inside an order response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFillEntry {
    pub price: Decimal,
    pub qty: Decimal,
    pub commission: Decimal,
    pub commission_asset: String,
}

/// Binance error body, e.g. `{"code": -2010, "msg": "insufficient balance"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}
