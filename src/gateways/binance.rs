use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::rest::{json_headers, RestEndpoint};
use super::{best_level, now_millis, Gateway, GatewayError};
use crate::http::ShutdownReport;
use crate::types::{Bbo, Exchange, Token};

pub const BINANCE_REST_URL: &str = "https://api.binance.com/api/v3";

/// `/depth` payload
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceDepth {
    #[serde(rename = "lastUpdateId", default)]
    pub last_update_id: u64,
    pub bids: Vec<Vec<Value>>,
    pub asks: Vec<Vec<Value>>,
}

impl BinanceDepth {
    /// Top of book; Binance does not timestamp depth snapshots
    pub fn to_bbo(&self, timestamp: u64) -> Result<Bbo, GatewayError> {
        Ok(Bbo::new(
            best_level(&self.bids, "bids")?,
            best_level(&self.asks, "asks")?,
            timestamp,
        ))
    }
}

/// Binance spot gateway
pub struct BinanceGateway {
    rest: RestEndpoint,
}

impl BinanceGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Ok(Self {
            rest: RestEndpoint::new(base_url)?,
        })
    }

    pub fn with_default_url() -> Result<Self, GatewayError> {
        Self::new(BINANCE_REST_URL)
    }
}

#[async_trait]
impl Gateway for BinanceGateway {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    fn ticker(&self, base: Token, quote: Token) -> String {
        format!("{}{}", base, quote)
    }

    async fn fetch_bbo(&self, base: Token, quote: Token) -> Result<Bbo, GatewayError> {
        let path = format!("/depth?symbol={}", self.ticker(base, quote));
        let depth: BinanceDepth = self.rest.get_json(&path, json_headers()).await?;
        depth.to_bbo(now_millis())
    }

    async fn shutdown(&self) -> ShutdownReport {
        self.rest.shutdown().await
    }
}
