use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of the top of book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.price, self.size)
    }
}

/// Best bid and offer snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bbo {
    pub bid: PriceLevel,
    pub ask: PriceLevel,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl Bbo {
    pub fn new(bid: PriceLevel, ask: PriceLevel, timestamp: u64) -> Self {
        Self {
            bid,
            ask,
            timestamp,
        }
    }

    /// Ask minus bid
    pub fn spread(&self) -> Decimal {
        self.ask.price - self.bid.price
    }

    /// Midpoint of bid and ask
    pub fn mid(&self) -> Decimal {
        (self.bid.price + self.ask.price) / Decimal::TWO
    }

    /// Crossed or locked books are not tradable quotes
    pub fn is_crossed(&self) -> bool {
        self.bid.price >= self.ask.price
    }
}
