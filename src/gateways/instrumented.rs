use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{Gateway, GatewayError};
use crate::http::ShutdownReport;
use crate::types::{Bbo, Exchange, Token};

/// Wraps a gateway to log every quote and its fetch latency
pub struct InstrumentedGateway<G> {
    inner: G,
}

impl<G: Gateway> InstrumentedGateway<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

#[async_trait]
impl<G: Gateway> Gateway for InstrumentedGateway<G> {
    fn exchange(&self) -> Exchange {
        self.inner.exchange()
    }

    fn ticker(&self, base: Token, quote: Token) -> String {
        self.inner.ticker(base, quote)
    }

    async fn fetch_bbo(&self, base: Token, quote: Token) -> Result<Bbo, GatewayError> {
        let started = Instant::now();
        let result = self.inner.fetch_bbo(base, quote).await;
        let latency_us = started.elapsed().as_micros();
        let exchange = self.inner.exchange();

        match &result {
            Ok(bbo) => {
                info!(
                    "{} {}{} Bid: {} Ask: {}",
                    exchange, base, quote, bbo.bid, bbo.ask
                );
                debug!("{} {}{} latency: {} us", exchange, base, quote, latency_us);
            }
            Err(e) => {
                warn!(
                    "{} {}{} BBO fetch failed after {} us: {}",
                    exchange, base, quote, latency_us, e
                );
            }
        }
        result
    }

    async fn shutdown(&self) -> ShutdownReport {
        info!("Shutting down {} gateway", self.inner.exchange());
        self.inner.shutdown().await
    }
}
