pub mod book;
pub mod instrument;

pub use book::{Bbo, PriceLevel};
pub use instrument::{Exchange, Token};
