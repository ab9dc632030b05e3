//! Concurrent ticker analysis module
//!
//! Runs the lookup and classification for every symbol in the universe as
//! independent tasks, keeping a bounded number of lookups in flight.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    api::{LookupError, TickerInfoProvider},
    classifier,
    models::{Config, TickerRecord},
};

/// Configuration for concurrent analysis
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub concurrency: usize,
    pub lookup_timeout: Duration,
    pub max_tickers: Option<usize>, // Optional limit for testing
}

impl From<&Config> for AnalyzeConfig {
    fn from(config: &Config) -> Self {
        Self {
            concurrency: config.concurrency,
            lookup_timeout: config.lookup_timeout,
            max_tickers: config.max_tickers,
        }
    }
}

/// Outcome of one ticker
#[derive(Debug)]
enum TickerOutcome {
    Kept(TickerRecord),
    Filtered,
    Failed(LookupError),
}

/// Result of a concurrent analysis run
#[derive(Debug)]
pub struct AnalysisResult {
    pub records: Vec<TickerRecord>,
    pub total_tickers: usize,
    pub kept_tickers: usize,
    pub filtered_tickers: usize,
    pub failed_tickers: usize,
}

/// Analyze every symbol and return the survivors in input order
pub async fn analyze_universe(
    provider: Arc<dyn TickerInfoProvider>,
    symbols: Vec<String>,
    config: &AnalyzeConfig,
) -> AnalysisResult {
    let symbols = if let Some(max_tickers) = config.max_tickers {
        let limited = symbols.into_iter().take(max_tickers).collect::<Vec<_>>();
        info!("🔢 Limiting to {} tickers", limited.len());
        limited
    } else {
        symbols
    };
    let total_tickers = symbols.len();
    let concurrency = config.concurrency.max(1);

    info!("🚀 Analyzing {} tickers with {} concurrent lookups", total_tickers, concurrency);

    let lookup_timeout = config.lookup_timeout;
    let mut outcomes: Vec<(usize, TickerOutcome)> = stream::iter(symbols.into_iter().enumerate())
        .map(|(index, symbol)| {
            let provider = Arc::clone(&provider);
            async move {
                let outcome = analyze_ticker(provider.as_ref(), &symbol, lookup_timeout).await;
                if let TickerOutcome::Failed(e) = &outcome {
                    debug!("Dropping {}: {}", symbol, e);
                }
                (index, outcome)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    outcomes.sort_by_key(|(index, _)| *index);

    let mut result = AnalysisResult {
        records: Vec::new(),
        total_tickers,
        kept_tickers: 0,
        filtered_tickers: 0,
        failed_tickers: 0,
    };

    for (_, outcome) in outcomes {
        match outcome {
            TickerOutcome::Kept(record) => {
                result.kept_tickers += 1;
                result.records.push(record);
            }
            TickerOutcome::Filtered => result.filtered_tickers += 1,
            TickerOutcome::Failed(_) => result.failed_tickers += 1,
        }
    }

    info!("✅ Analysis completed");
    info!("📊 Results: {} kept, {} filtered, {} failed",
          result.kept_tickers, result.filtered_tickers, result.failed_tickers);

    result
}

/// Look up and classify one ticker. Failures are not retried.
async fn analyze_ticker(
    provider: &dyn TickerInfoProvider,
    symbol: &str,
    lookup_timeout: Duration,
) -> TickerOutcome {
    let info = match tokio::time::timeout(lookup_timeout, provider.lookup(symbol)).await {
        Ok(Ok(info)) => info,
        Ok(Err(e)) => return TickerOutcome::Failed(e),
        Err(_) => return TickerOutcome::Failed(LookupError::Timeout(lookup_timeout)),
    };

    match classifier::classify(&info) {
        Some(record) => TickerOutcome::Kept(record),
        None => TickerOutcome::Filtered,
    }
}
