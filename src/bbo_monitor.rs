use arber_http::{
    gateways::{BinanceGateway, BybitGateway, CoinbaseGateway, InstrumentedGateway, OkxGateway},
    init_logging, Bbo, Exchange, Gateway, GatewayError, MonitorConfig,
};
use futures_util::future::join_all;
use log::{error, info, warn};
use tokio::time::{interval, MissedTickBehavior};

fn build_gateways(
    config: &MonitorConfig,
) -> Result<Vec<Box<dyn Gateway>>, GatewayError> {
    Ok(vec![
        Box::new(InstrumentedGateway::new(BinanceGateway::new(
            config.url(Exchange::Binance),
        )?)),
        Box::new(InstrumentedGateway::new(BybitGateway::new(
            config.url(Exchange::Bybit),
        )?)),
        Box::new(InstrumentedGateway::new(OkxGateway::new(
            config.url(Exchange::Okx),
        )?)),
        Box::new(InstrumentedGateway::new(CoinbaseGateway::new(
            config.url(Exchange::Coinbase),
        )?)),
    ])
}

/// Best bid and lowest ask across the venues that answered this round
fn summarize(round: u64, quotes: &[(Exchange, Bbo)]) {
    let best_bid = quotes.iter().max_by_key(|(_, bbo)| bbo.bid.price);
    let best_ask = quotes.iter().min_by_key(|(_, bbo)| bbo.ask.price);

    if let (Some((bid_venue, bid)), Some((ask_venue, ask))) = (best_bid, best_ask) {
        info!(
            "Round {}: {}/{} venues, best bid {} on {}, best ask {} on {}, cross spread {}",
            round,
            quotes.len(),
            Exchange::ALL.len(),
            bid.bid,
            bid_venue,
            ask.ask,
            ask_venue,
            ask.ask.price - bid.bid.price
        );
    } else {
        warn!("Round {}: no venue returned a quote", round);
    }
}

async fn poll(gateways: &[Box<dyn Gateway>], config: &MonitorConfig) {
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut round = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping after {} round(s)", round);
                return;
            }
        }

        round += 1;
        let results = join_all(
            gateways
                .iter()
                .map(|gateway| gateway.fetch_bbo(config.base, config.quote)),
        )
        .await;

        let quotes: Vec<(Exchange, Bbo)> = gateways
            .iter()
            .zip(results)
            .filter_map(|(gateway, result)| result.ok().map(|bbo| (gateway.exchange(), bbo)))
            .collect();
        summarize(round, &quotes);

        if config.rounds != 0 && round >= config.rounds {
            return;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = MonitorConfig::from_env()?;
    init_logging(&config.log_level, config.log_file.as_deref())?;

    info!(
        "BBO monitor for {}/{} every {:?} ({} rounds)",
        config.base,
        config.quote,
        config.poll_interval,
        if config.rounds == 0 {
            "unlimited".to_string()
        } else {
            config.rounds.to_string()
        }
    );

    let gateways = match build_gateways(&config) {
        Ok(gateways) => gateways,
        Err(e) => {
            error!("Failed to start gateways: {}", e);
            return Err(e.into());
        }
    };

    poll(&gateways, &config).await;

    for gateway in &gateways {
        let report = gateway.shutdown().await;
        info!(
            "{} closed: {} connection(s) released, {} request(s) abandoned",
            gateway.exchange(),
            report.destroyed,
            report.abandoned
        );
    }
    Ok(())
}
