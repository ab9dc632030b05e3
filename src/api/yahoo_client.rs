use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::{LookupError, TickerInfoProvider};
use crate::models::{Config, TickerInfo};

const QUOTE_MODULES: &str = "price,summaryDetail,assetProfile";

/// quoteSummary envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteModules>>,
    error: Option<QuoteSummaryError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryError {
    code: String,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct QuoteModules {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetailModule>,
    asset_profile: Option<AssetProfileModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PriceModule {
    exchange: Option<String>,
    short_name: Option<String>,
    market_cap: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SummaryDetailModule {
    average_volume: Option<RawNumber>,
    market_cap: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AssetProfileModule {
    sector: Option<String>,
}

/// Yahoo wraps numbers as `{"raw": 123, "fmt": "123"}`; missing values come back as `{}`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNumber {
    raw: Option<f64>,
}

fn raw(value: &Option<RawNumber>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

/// Yahoo Finance quoteSummary client
pub struct YahooClient {
    client: Client,
    base_url: Url,
    cookie_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .cookie_store(true)
            .build()?;

        let base_url = Url::parse(&config.yahoo_base_url)
            .with_context(|| format!("invalid Yahoo base url: {}", config.yahoo_base_url))?;

        Ok(Self {
            client,
            base_url,
            cookie_url: config.yahoo_cookie_url.clone(),
            crumb: Mutex::new(None),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::Malformed(format!("cannot use {} as a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Get the session crumb, fetching it on first use
    async fn get_crumb(&self) -> Result<String, LookupError> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        // The cookie endpoint answers 404 but still sets the session cookie
        if let Err(e) = self.client.get(&self.cookie_url).send().await {
            warn!("Cookie request to {} failed: {}", self.cookie_url, e);
        }

        let url = self.endpoint(&["v1", "test", "getcrumb"])?;
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Crumb(format!("status {}", response.status())));
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() {
            return Err(LookupError::Crumb("empty crumb".to_string()));
        }

        info!("🔑 Obtained Yahoo session crumb");
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }
}

#[async_trait]
impl TickerInfoProvider for YahooClient {
    async fn lookup(&self, symbol: &str) -> Result<TickerInfo, LookupError> {
        let crumb = self.get_crumb().await?;

        let mut url = self.endpoint(&["v10", "finance", "quoteSummary", symbol])?;
        url.query_pairs_mut()
            .append_pair("modules", QUOTE_MODULES)
            .append_pair("crumb", &crumb);

        debug!("Making request to: {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            // Force a fresh crumb for later lookups; this one is still a failure
            self.invalidate_crumb().await;
        }

        // 404 still carries a quoteSummary error body
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(LookupError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_quote_summary(symbol, &body)
    }
}

/// Turn a quoteSummary body into a TickerInfo
fn parse_quote_summary(symbol: &str, body: &str) -> Result<TickerInfo, LookupError> {
    let response: QuoteSummaryResponse =
        serde_json::from_str(body).map_err(|e| LookupError::Malformed(e.to_string()))?;

    if let Some(err) = response.quote_summary.error {
        return Err(if err.code == "Not Found" {
            LookupError::SymbolNotFound {
                symbol: symbol.to_string(),
            }
        } else {
            LookupError::Malformed(format!("{}: {}", err.code, err.description))
        });
    }

    let modules = response
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| LookupError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;

    let price = modules.price.unwrap_or_default();
    let detail = modules.summary_detail.unwrap_or_default();

    Ok(TickerInfo {
        symbol: symbol.to_string(),
        exchange: price.exchange,
        average_volume: raw(&detail.average_volume)
            .filter(|v| *v >= 0.0)
            .map(|v| v as u64),
        market_cap: raw(&price.market_cap).or_else(|| raw(&detail.market_cap)),
        sector: modules.asset_profile.and_then(|p| p.sector),
        short_name: price.short_name,
    })
}
