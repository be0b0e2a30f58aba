//! Exchange gateways that read top-of-book quotes through the HTTP engine.
//!
//! Each venue owns its endpoint layout and payload parsing and talks to the
//! engine only through its submission entry points.

pub mod binance;
pub mod bybit;
pub mod coinbase;
pub mod instrumented;
pub mod okx;
pub mod rest;

pub use binance::BinanceGateway;
pub use bybit::BybitGateway;
pub use coinbase::CoinbaseGateway;
pub use instrumented::InstrumentedGateway;
pub use okx::OkxGateway;
pub use rest::RestEndpoint;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::http::{EngineError, ShutdownReport};
use crate::types::{Bbo, Exchange, PriceLevel, Token};

/// Connections each gateway keeps in its engine pool
pub const GATEWAY_POOL_SIZE: usize = 5;

/// Gateway errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Request failed in the engine (transport, HTTP status, decode)
    Engine(EngineError),
    /// Venue answered with an application level error
    Api(String),
    /// Book side has no levels
    EmptyBook(&'static str),
    /// A level could not be read as price/size
    InvalidLevel(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Engine(e) => write!(f, "Request failed: {}", e),
            GatewayError::Api(msg) => write!(f, "API error: {}", msg),
            GatewayError::EmptyBook(side) => write!(f, "Order book has no {}", side),
            GatewayError::InvalidLevel(msg) => write!(f, "Invalid price level: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<EngineError> for GatewayError {
    fn from(error: EngineError) -> Self {
        GatewayError::Engine(error)
    }
}

/// Venue capability: name a market and fetch its best bid and offer
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Venue this gateway talks to
    fn exchange(&self) -> Exchange;

    /// Venue specific market symbol for the pair
    fn ticker(&self, base: Token, quote: Token) -> String;

    /// Current best bid and offer for the pair
    async fn fetch_bbo(&self, base: Token, quote: Token) -> Result<Bbo, GatewayError>;

    /// Stop the underlying engine and release its connections
    async fn shutdown(&self) -> ShutdownReport;
}

/// Read a decimal from a JSON string or number
fn decimal_value(value: &Value) -> Result<Decimal, GatewayError> {
    match value {
        Value::String(s) => {
            Decimal::from_str(s).map_err(|e| GatewayError::InvalidLevel(format!("{}: {}", s, e)))
        }
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .map_err(|e| GatewayError::InvalidLevel(format!("{}: {}", n, e))),
        other => Err(GatewayError::InvalidLevel(format!(
            "expected number, got {}",
            other
        ))),
    }
}

/// First level of a `[[price, size, ...], ...]` book side
pub fn best_level(levels: &[Vec<Value>], side: &'static str) -> Result<PriceLevel, GatewayError> {
    let level = levels.first().ok_or(GatewayError::EmptyBook(side))?;
    match level.as_slice() {
        [price, size, ..] => Ok(PriceLevel::new(decimal_value(price)?, decimal_value(size)?)),
        _ => Err(GatewayError::InvalidLevel(format!(
            "{} level has {} fields",
            side,
            level.len()
        ))),
    }
}

/// Wall clock in milliseconds, for venues that do not timestamp their books
pub(crate) fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}
