use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::api::{SecClient, TickerInfoProvider, YahooClient};
use crate::concurrent_fetcher::{analyze_universe, AnalyzeConfig};
use crate::models::Config;
use crate::registry::{Registry, UpdateSummary};

/// Daily registry job: master list, per-ticker analysis, registry update
pub struct DataCollector {
    sec_client: SecClient,
    provider: Arc<dyn TickerInfoProvider>,
    registry: Registry,
    analyze_config: AnalyzeConfig,
}

impl DataCollector {
    pub fn new(
        sec_client: SecClient,
        provider: Arc<dyn TickerInfoProvider>,
        registry: Registry,
        analyze_config: AnalyzeConfig,
    ) -> Self {
        Self {
            sec_client,
            provider,
            registry,
            analyze_config,
        }
    }

    /// Wire up the SEC and Yahoo clients described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let sec_client = SecClient::new(config)?;
        let provider: Arc<dyn TickerInfoProvider> = Arc::new(YahooClient::new(config)?);

        Ok(Self::new(
            sec_client,
            provider,
            Registry::from_config(config),
            AnalyzeConfig::from(config),
        ))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run the whole job for `date`.
    ///
    /// Only a master-list failure or an output write failure is an error;
    /// individual tickers that cannot be looked up are left out.
    pub async fn run(&self, date: NaiveDate) -> Result<UpdateSummary> {
        let tickers = self
            .sec_client
            .fetch_tickers()
            .await
            .context("failed to fetch master ticker list")?;

        info!("[{}] Analyzing {} tickers...", date, tickers.len());
        let analysis = analyze_universe(Arc::clone(&self.provider), tickers, &self.analyze_config).await;

        let summary = self.registry.update(date, &analysis.records)?;

        info!(
            "🎉 Update complete. Universe: {} | Added: {} | Removed: {}",
            summary.universe_size,
            summary.added.len(),
            summary.removed.len()
        );

        Ok(summary)
    }
}
