use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::rest::{json_headers, RestEndpoint};
use super::{best_level, now_millis, Gateway, GatewayError};
use crate::http::ShutdownReport;
use crate::types::{Bbo, Exchange, Token};

pub const COINBASE_REST_URL: &str = "https://api.exchange.coinbase.com/products";

/// `/{product}/book` payload; levels are `[price, size, num_orders]`
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseBook {
    pub bids: Vec<Vec<Value>>,
    pub asks: Vec<Vec<Value>>,
    #[serde(default)]
    pub sequence: u64,
}

impl CoinbaseBook {
    pub fn to_bbo(&self, timestamp: u64) -> Result<Bbo, GatewayError> {
        Ok(Bbo::new(
            best_level(&self.bids, "bids")?,
            best_level(&self.asks, "asks")?,
            timestamp,
        ))
    }
}

/// Coinbase Exchange gateway
pub struct CoinbaseGateway {
    rest: RestEndpoint,
}

impl CoinbaseGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Ok(Self {
            rest: RestEndpoint::new(base_url)?,
        })
    }

    pub fn with_default_url() -> Result<Self, GatewayError> {
        Self::new(COINBASE_REST_URL)
    }
}

#[async_trait]
impl Gateway for CoinbaseGateway {
    fn exchange(&self) -> Exchange {
        Exchange::Coinbase
    }

    /// Coinbase quotes stablecoin pairs against USD
    fn ticker(&self, base: Token, quote: Token) -> String {
        if base.is_stablecoin() {
            format!("USD-{}", quote)
        } else if quote.is_stablecoin() {
            format!("{}-USD", base)
        } else {
            format!("{}-{}", base, quote)
        }
    }

    async fn fetch_bbo(&self, base: Token, quote: Token) -> Result<Bbo, GatewayError> {
        let path = format!("/{}/book", self.ticker(base, quote));
        let mut headers = json_headers();
        // Coinbase rejects requests without a user agent
        headers.insert(
            "User-Agent".to_string(),
            concat!("arber_http/", env!("CARGO_PKG_VERSION")).to_string(),
        );
        let book: CoinbaseBook = self.rest.get_json(&path, headers).await?;
        book.to_bbo(now_millis())
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
    fn test_book_with_order_counts() {
        let book: CoinbaseBook = serde_json::from_str(
            r#"{"bids":[["295.96","4.39088265",2]],"asks":[["295.97","25.23542881",12]],"sequence":3}"#,
        )
        .unwrap();

        let bbo = book.to_bbo(7).unwrap();
        assert_eq!(bbo.bid.price, Decimal::new(29596, 2));
        assert_eq!(bbo.ask.price, Decimal::new(29597, 2));
        assert_eq!(book.sequence, 3);
    }
}
