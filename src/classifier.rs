//! Liquidity filter and market-cap tiering for a single ticker.

use crate::models::{CapTier, TickerInfo, TickerRecord};

/// Exchange codes (Yahoo notation) of the major US venues we keep
pub const MAJOR_EXCHANGES: [&str; 6] = ["NYQ", "NMS", "NGM", "NCM", "ASE", "PCX"];

/// Minimum average daily share volume
pub const MIN_AVERAGE_VOLUME: u64 = 500_000;

const NOT_AVAILABLE: &str = "N/A";

impl CapTier {
    /// Tier for a market cap in USD. Every threshold is an inclusive lower bound.
    pub fn from_market_cap(market_cap: f64) -> Self {
        if market_cap >= 200_000_000_000.0 {
            CapTier::Mega
        } else if market_cap >= 10_000_000_000.0 {
            CapTier::Large
        } else if market_cap >= 2_000_000_000.0 {
            CapTier::Mid
        } else if market_cap >= 250_000_000.0 {
            CapTier::Small
        } else if market_cap >= 50_000_000.0 {
            CapTier::Micro
        } else {
            CapTier::Nano
        }
    }
}

pub fn is_major_exchange(exchange: &str) -> bool {
    MAJOR_EXCHANGES.contains(&exchange)
}

/// Apply the exchange and volume filters and build the record.
///
/// Returns `None` when the ticker does not belong in the universe. A missing
/// volume or market cap counts as zero.
pub fn classify(info: &TickerInfo) -> Option<TickerRecord> {
    let exchange = info.exchange.as_deref().filter(|e| is_major_exchange(e))?;

    let avg_volume = info.average_volume.unwrap_or(0);
    if avg_volume < MIN_AVERAGE_VOLUME {
        return None;
    }

    let cap_tier = CapTier::from_market_cap(info.market_cap.unwrap_or(0.0));

    Some(TickerRecord {
        ticker: info.symbol.clone(),
        name: info
            .short_name
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        sector: info
            .sector
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        cap_tier,
        avg_volume,
        exchange: exchange.to_string(),
    })
}
