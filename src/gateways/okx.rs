use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::rest::{json_headers, RestEndpoint};
use super::{best_level, Gateway, GatewayError};
use crate::http::ShutdownReport;
use crate::types::{Bbo, Exchange, Token};

pub const OKX_REST_URL: &str = "https://www.okx.com/api/v5";

#[derive(Debug, Clone, Deserialize)]
pub struct OkxBook {
    pub bids: Vec<Vec<Value>>,
    pub asks: Vec<Vec<Value>>,
    /// Milliseconds, sent as a string
    pub ts: String,
}

/// `/market/books` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct OkxBooksResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Vec<OkxBook>,
}

impl OkxBooksResponse {
    pub fn to_bbo(&self) -> Result<Bbo, GatewayError> {
        if !self.code.is_empty() && self.code != "0" {
            return Err(GatewayError::Api(format!("code {}: {}", self.code, self.msg)));
        }
        let book = self
            .data
            .first()
            .ok_or_else(|| GatewayError::Api("empty data array".to_string()))?;
        let timestamp = book
            .ts
            .parse::<u64>()
            .map_err(|e| GatewayError::Api(format!("invalid ts {}: {}", book.ts, e)))?;

        Ok(Bbo::new(
            best_level(&book.bids, "bids")?,
            best_level(&book.asks, "asks")?,
            timestamp,
        ))
    }
}

/// OKX v5 spot gateway
pub struct OkxGateway {
    rest: RestEndpoint,
}

impl OkxGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Ok(Self {
            rest: RestEndpoint::new(base_url)?,
        })
    }

    pub fn with_default_url() -> Result<Self, GatewayError> {
        Self::new(OKX_REST_URL)
    }
}

#[async_trait]
impl Gateway for OkxGateway {
    fn exchange(&self) -> Exchange {
        Exchange::Okx
    }

    fn ticker(&self, base: Token, quote: Token) -> String {
        format!("{}-{}", base, quote)
    }

    async fn fetch_bbo(&self, base: Token, quote: Token) -> Result<Bbo, GatewayError> {
        let path = format!("/market/books?instId={}", self.ticker(base, quote));
        let books: OkxBooksResponse = self.rest.get_json(&path, json_headers()).await?;
        books.to_bbo()
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
    fn test_books_to_bbo() {
        let books: OkxBooksResponse = serde_json::from_str(
            r#"{"code":"0","msg":"","data":[{"asks":[["41006.8","0.60038921","0","1"]],"bids":[["41006.3","0.30178218","0","2"]],"ts":"1629966436396"}]}"#,
        )
        .unwrap();

        let bbo = books.to_bbo().unwrap();
        assert_eq!(bbo.ask.price, Decimal::new(410068, 1));
        assert_eq!(bbo.bid.price, Decimal::new(410063, 1));
        assert_eq!(bbo.timestamp, 1629966436396);
    }

    #[test]
    fn test_error_code() {
        let books: OkxBooksResponse =
            serde_json::from_str(r#"{"code":"51001","msg":"Instrument ID does not exist","data":[]}"#)
                .unwrap();
        assert!(matches!(books.to_bbo(), Err(GatewayError::Api(msg)) if msg.contains("51001")));
    }
}
