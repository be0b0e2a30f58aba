use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::rest::{json_headers, RestEndpoint};
use super::{best_level, Gateway, GatewayError};
use crate::http::ShutdownReport;
use crate::types::{Bbo, Exchange, Token};

pub const BYBIT_REST_URL: &str = "https://api.bybit.com/v5";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BybitBook {
    #[serde(default)]
    pub b: Vec<Vec<Value>>,
    #[serde(default)]
    pub a: Vec<Vec<Value>>,
}

/// `/market/orderbook` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct BybitOrderbookResponse {
    #[serde(rename = "retCode", default)]
    pub ret_code: i64,
    #[serde(rename = "retMsg", default)]
    pub ret_msg: String,
    #[serde(default)]
    pub result: BybitBook,
    #[serde(default)]
    pub time: u64,
}

impl BybitOrderbookResponse {
    pub fn to_bbo(&self) -> Result<Bbo, GatewayError> {
        if self.ret_code != 0 {
            return Err(GatewayError::Api(format!(
                "retCode {}: {}",
                self.ret_code, self.ret_msg
            )));
        }
        Ok(Bbo::new(
            best_level(&self.result.b, "bids")?,
            best_level(&self.result.a, "asks")?,
            self.time,
        ))
    }
}

/// Bybit v5 spot gateway
pub struct BybitGateway {
    rest: RestEndpoint,
}

impl BybitGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Ok(Self {
            rest: RestEndpoint::new(base_url)?,
        })
    }

    pub fn with_default_url() -> Result<Self, GatewayError> {
        Self::new(BYBIT_REST_URL)
    }
}

#[async_trait]
impl Gateway for BybitGateway {
    fn exchange(&self) -> Exchange {
        Exchange::Bybit
    }

    fn ticker(&self, base: Token, quote: Token) -> String {
        format!("{}{}", base, quote)
    }

    async fn fetch_bbo(&self, base: Token, quote: Token) -> Result<Bbo, GatewayError> {
        let path = format!(
            "/market/orderbook?category=spot&symbol={}",
            self.ticker(base, quote)
        );
        let book: BybitOrderbookResponse = self.rest.get_json(&path, json_headers()).await?;
        book.to_bbo()
    }

    async fn shutdown(&self) -> ShutdownReport {
        self.rest.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_orderbook_to_bbo() {
        let book: BybitOrderbookResponse = serde_json::from_str(
            r#"{"retCode":0,"retMsg":"OK","result":{"s":"BTCUSDT","b":[["16493.50","0.006"]],"a":[["16611.00","0.029"]],"ts":1672765737733,"u":5277055},"time":1672765737734}"#,
        )
        .unwrap();

        let bbo = book.to_bbo().unwrap();
        assert_eq!(bbo.bid.price, Decimal::new(1649350, 2));
        assert_eq!(bbo.ask.size, Decimal::new(29, 3));
        assert_eq!(bbo.timestamp, 1672765737734);
    }

    #[test]
    fn test_error_envelope() {
        let book: BybitOrderbookResponse =
            serde_json::from_str(r#"{"retCode":10001,"retMsg":"Not supported symbols","result":{},"time":1}"#)
                .unwrap();

        assert_eq!(
            book.to_bbo(),
            Err(GatewayError::Api("retCode 10001: Not supported symbols".to_string()))
        );
    }
}
