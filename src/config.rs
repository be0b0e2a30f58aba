use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::gateways::binance::BINANCE_REST_URL;
use crate::gateways::bybit::BYBIT_REST_URL;
use crate::gateways::coinbase::COINBASE_REST_URL;
use crate::gateways::okx::OKX_REST_URL;
use crate::types::{Exchange, Token};

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { key: String, value: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value, reason } => {
                write!(f, "Invalid value {:?} for {}: {}", value, key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings for the BBO monitor binary, read from `ARBER_*` environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// `ARBER_LOG_LEVEL`
    pub log_level: String,
    /// `ARBER_LOG_FILE`
    pub log_file: Option<PathBuf>,
    /// `ARBER_POLL_INTERVAL_MS`
    pub poll_interval: Duration,
    /// `ARBER_POLL_ROUNDS`, 0 polls until interrupted
    pub rounds: u64,
    /// `ARBER_BASE`
    pub base: Token,
    /// `ARBER_QUOTE`
    pub quote: Token,
    pub binance_url: String,
    pub bybit_url: String,
    pub okx_url: String,
    pub coinbase_url: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            poll_interval: Duration::from_millis(1000),
            rounds: 10,
            base: Token::Btc,
            quote: Token::Usdt,
            binance_url: BINANCE_REST_URL.to_string(),
            bybit_url: BYBIT_REST_URL.to_string(),
            okx_url: OKX_REST_URL.to_string(),
            coinbase_url: COINBASE_REST_URL.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(level) = get("ARBER_LOG_LEVEL") {
            config.log_level = level.trim().to_ascii_lowercase();
        }
        config.log_file = get("ARBER_LOG_FILE").map(PathBuf::from);

        if let Some(value) = get("ARBER_POLL_INTERVAL_MS") {
            let millis = parse_number("ARBER_POLL_INTERVAL_MS", &value)?;
            if millis == 0 {
                return Err(invalid("ARBER_POLL_INTERVAL_MS", &value, "must be positive"));
            }
            config.poll_interval = Duration::from_millis(millis);
        }
        if let Some(value) = get("ARBER_POLL_ROUNDS") {
            config.rounds = parse_number("ARBER_POLL_ROUNDS", &value)?;
        }

        if let Some(value) = get("ARBER_BASE") {
            config.base = value
                .parse()
                .map_err(|reason: String| invalid("ARBER_BASE", &value, &reason))?;
        }
        if let Some(value) = get("ARBER_QUOTE") {
            config.quote = value
                .parse()
                .map_err(|reason: String| invalid("ARBER_QUOTE", &value, &reason))?;
        }
        if config.base == config.quote {
            return Err(invalid(
                "ARBER_QUOTE",
                config.quote.as_str(),
                "must differ from ARBER_BASE",
            ));
        }

        for exchange in Exchange::ALL {
            let key = format!("ARBER_{}_URL", exchange.as_str());
            if let Some(url) = get(&key) {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(invalid(&key, &url, "expected an http(s) URL"));
                }
                *config.url_mut(exchange) = url;
            }
        }

        Ok(config)
    }

    /// REST base URL configured for `exchange`
    pub fn url(&self, exchange: Exchange) -> &str {
        match exchange {
            Exchange::Binance => &self.binance_url,
            Exchange::Bybit => &self.bybit_url,
            Exchange::Okx => &self.okx_url,
            Exchange::Coinbase => &self.coinbase_url,
        }
    }

    fn url_mut(&mut self, exchange: Exchange) -> &mut String {
        match exchange {
            Exchange::Binance => &mut self.binance_url,
            Exchange::Bybit => &mut self.bybit_url,
            Exchange::Okx => &mut self.okx_url,
            Exchange::Coinbase => &mut self.coinbase_url,
        }
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| invalid(key, value, &e.to_string()))
}
