use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::models::Config;

/// One row of the SEC `company_tickers.json` document; `cik_str` and `title` are ignored
#[derive(Debug, Deserialize)]
struct SecTickerEntry {
    ticker: String,
}

/// Client for the SEC master ticker list
pub struct SecClient {
    client: Client,
    tickers_url: String,
}

impl SecClient {
    pub fn new(config: &Config) -> Result<Self> {
        // SEC rejects requests without a descriptive agent
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .user_agent(config.sec_user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            tickers_url: config.sec_tickers_url.clone(),
        })
    }

    /// Fetch the full list of exchange-listed tickers, in SEC row order
    pub async fn fetch_tickers(&self) -> Result<Vec<String>> {
        info!("🌐 Fetching master ticker list from {}", self.tickers_url);

        let response = self
            .client
            .get(&self.tickers_url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.tickers_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Master list request failed with status {}: {}", status, error_text));
        }

        let body = response.text().await?;
        let tickers = parse_company_tickers(&body)?;

        info!("✅ Parsed {} tickers from master list", tickers.len());
        Ok(tickers)
    }
}

/// Parse the SEC document: an object keyed by row index ("0", "1", ...).
///
/// Tickers come back in row order, trimmed, without blanks or duplicates.
pub fn parse_company_tickers(body: &str) -> Result<Vec<String>> {
    let rows: HashMap<String, SecTickerEntry> =
        serde_json::from_str(body).context("master ticker list is not in the expected format")?;

    let mut indexed: Vec<(u64, String)> = rows
        .into_iter()
        .map(|(key, entry)| {
            let index = key
                .parse::<u64>()
                .map_err(|_| anyhow!("unexpected row key in master list: {}", key))?;
            Ok((index, entry.ticker.trim().to_string()))
        })
        .collect::<Result<_>>()?;
    indexed.sort_by_key(|(index, _)| *index);

    let mut seen = HashSet::new();
    let tickers: Vec<String> = indexed
        .into_iter()
        .map(|(_, ticker)| ticker)
        .filter(|ticker| !ticker.is_empty() && seen.insert(ticker.clone()))
        .collect();

    debug!("Master list contains {} unique tickers", tickers.len());
    Ok(tickers)
}
