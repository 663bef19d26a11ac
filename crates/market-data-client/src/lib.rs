//! HTTP clients for the three market-data providers: a quote and history
//! provider, a crypto exchange and a bond-yield series provider.
//!
//! Each client owns its own rate budget and takes a base URL so it can be
//! pointed at a mock server.

pub mod binance;
pub mod fred;
pub mod http;
pub mod yahoo;

pub use binance::BinanceClient;
pub use fred::FredClient;
pub use http::{HttpTransport, RateLimiter};
pub use yahoo::YahooClient;
