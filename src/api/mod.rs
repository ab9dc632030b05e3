use async_trait::async_trait;
use thiserror::Error;

use crate::models::TickerInfo;

pub mod sec_client;
pub mod yahoo_client;
pub use sec_client::SecClient;
pub use yahoo_client::YahooClient;

/// Why a single ticker lookup failed.
///
/// The analyzer treats every variant the same way (the ticker is dropped);
/// the distinction only shows up in debug logs.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("could not obtain session crumb: {0}")]
    Crumb(String),

    #[error("lookup timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Source of per-symbol exchange, liquidity and size data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TickerInfoProvider: Send + Sync {
    async fn lookup(&self, symbol: &str) -> Result<TickerInfo, LookupError>;
}
