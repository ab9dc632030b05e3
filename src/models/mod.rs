use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// One surviving ticker in the active universe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRecord {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub cap_tier: CapTier,
    pub avg_volume: u64,
    pub exchange: String,
}

/// Market capitalization tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapTier {
    #[serde(rename = "Mega-Cap")]
    Mega,
    #[serde(rename = "Large-Cap")]
    Large,
    #[serde(rename = "Mid-Cap")]
    Mid,
    #[serde(rename = "Small-Cap")]
    Small,
    #[serde(rename = "Micro-Cap")]
    Micro,
    #[serde(rename = "Nano-Cap")]
    Nano,
}

impl CapTier {
    pub const ALL: [CapTier; 6] = [
        CapTier::Mega,
        CapTier::Large,
        CapTier::Mid,
        CapTier::Small,
        CapTier::Micro,
        CapTier::Nano,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CapTier::Mega => "Mega-Cap",
            CapTier::Large => "Large-Cap",
            CapTier::Mid => "Mid-Cap",
            CapTier::Small => "Small-Cap",
            CapTier::Micro => "Micro-Cap",
            CapTier::Nano => "Nano-Cap",
        }
    }
}

impl std::fmt::Display for CapTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw lookup result from the quote provider. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerInfo {
    pub symbol: String,
    pub exchange: Option<String>,
    pub average_volume: Option<u64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    pub short_name: Option<String>,
}

/// One run's membership changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub date: NaiveDate,
    pub added_count: usize,
    pub removed_count: usize,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangelogEntry {
    pub fn new(date: NaiveDate, added: BTreeSet<String>, removed: BTreeSet<String>) -> Self {
        Self {
            date,
            added_count: added.len(),
            removed_count: removed.len(),
            added: added.into_iter().collect(),
            removed: removed.into_iter().collect(),
        }
    }
}

/// Configuration for the registry job
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub sitemap_path: PathBuf,
    pub site_base_url: String,
    pub sec_tickers_url: String,
    pub sec_user_agent: String,
    pub yahoo_base_url: String,
    pub yahoo_cookie_url: String,
    pub concurrency: usize,
    pub lookup_timeout: Duration,
    pub max_tickers: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sitemap_path: PathBuf::from("sitemap.xml"),
            site_base_url: "https://registry.stockstreaks.com".to_string(),
            sec_tickers_url: "https://www.sec.gov/files/company_tickers.json".to_string(),
            sec_user_agent: "StockStreaksRegistry/1.0 (contact@stockstreaks.com)".to_string(),
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            yahoo_cookie_url: "https://fc.yahoo.com".to_string(),
            concurrency: 16,
            lookup_timeout: Duration::from_secs(1200),
            max_tickers: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let defaults = Config::default();
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Ok(Config {
            data_dir: var("REGISTRY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            sitemap_path: var("REGISTRY_SITEMAP_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sitemap_path),
            site_base_url: var("REGISTRY_BASE_URL").unwrap_or(defaults.site_base_url),
            sec_tickers_url: var("SEC_TICKERS_URL").unwrap_or(defaults.sec_tickers_url),
            sec_user_agent: var("SEC_USER_AGENT").unwrap_or(defaults.sec_user_agent),
            yahoo_base_url: var("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            yahoo_cookie_url: var("YAHOO_COOKIE_URL").unwrap_or(defaults.yahoo_cookie_url),
            concurrency: var("ANALYZE_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.concurrency),
            lookup_timeout: var("LOOKUP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.lookup_timeout),
            max_tickers: var("MAX_TICKERS").and_then(|v| v.parse().ok()),
        })
    }
}
