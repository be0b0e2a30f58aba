use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tradable asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    Btc,
    Eth,
    Usdc,
    Usdt,
}

impl Token {
    pub fn as_str(&self) -> &'static str {
        match self {
            Token::Btc => "BTC",
            Token::Eth => "ETH",
            Token::Usdc => "USDC",
            Token::Usdt => "USDT",
        }
    }

    /// USD-pegged stablecoin
    pub fn is_stablecoin(&self) -> bool {
        matches!(self, Token::Usdc | Token::Usdt)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Token {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BTC" => Ok(Token::Btc),
            "ETH" => Ok(Token::Eth),
            "USDC" => Ok(Token::Usdc),
            "USDT" => Ok(Token::Usdt),
            other => Err(format!("Unknown token: {}", other)),
        }
    }
}

/// Trading venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    Binance,
    Bybit,
    Okx,
    Coinbase,
}

impl Exchange {
    pub const ALL: [Exchange; 4] = [
        Exchange::Binance,
        Exchange::Bybit,
        Exchange::Okx,
        Exchange::Coinbase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Binance => "BINANCE",
            Exchange::Bybit => "BYBIT",
            Exchange::Okx => "OKX",
            Exchange::Coinbase => "COINBASE",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_parse_case_insensitive() {
        assert_eq!("btc".parse::<Token>(), Ok(Token::Btc));
        assert_eq!(" USDT ".parse::<Token>(), Ok(Token::Usdt));
        assert!("DOGE".parse::<Token>().is_err());
    }

    #[test]
    fn test_stablecoins() {
        assert!(Token::Usdc.is_stablecoin());
        assert!(!Token::Eth.is_stablecoin());
    }

    #[test]
    fn test_exchange_display() {
        assert_eq!(Exchange::Okx.to_string(), "OKX");
        assert_eq!(Exchange::ALL.len(), 4);
    }
}
