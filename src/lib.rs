//! Asynchronous HTTP request engine for exchange market data.
//!
//! [`http`] holds the engine: a bounded connection pool serviced by one
//! dispatcher, with deferred and typed results. [`gateways`] are venue clients
//! built on top of it.

pub mod config;
pub mod gateways;
pub mod http;
pub mod logging;
pub mod types;

pub use config::{ConfigError, MonitorConfig};
pub use gateways::{
    BinanceGateway, BybitGateway, CoinbaseGateway, Gateway, GatewayError, InstrumentedGateway,
    OkxGateway,
};
pub use http::{
    AsyncHttpEngine, Deferred, EngineError, EngineStats, Headers, Method, Request, Response,
    ShutdownReport,
};
pub use logging::init_logging;
pub use types::{Bbo, Exchange, PriceLevel, Token};
