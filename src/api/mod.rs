//! Binance REST clients implementing the exchange collaborator contracts.

mod market_client;
mod trade_client;
mod types;

pub use market_client::MarketClient;
pub use trade_client::TradeClient;
pub use types::{
    AccountResponse, ApiError, BalanceEntry, ExchangeInfoResponse, KlineRow, OrderFillEntry,
    OrderResponse, SymbolFilter, SymbolInfo,
};
