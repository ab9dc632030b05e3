//! In-memory quote provider for tests

use async_trait::async_trait;
use std::collections::HashMap;
use stock_registry::api::{LookupError, TickerInfoProvider};
use stock_registry::models::TickerInfo;

/// Serves canned lookups; unknown symbols are "not found"
#[derive(Default)]
pub struct StaticProvider {
    infos: HashMap<String, TickerInfo>,
}

impl StaticProvider {
    pub fn new(infos: impl IntoIterator<Item = TickerInfo>) -> Self {
        Self {
            infos: infos.into_iter().map(|i| (i.symbol.clone(), i)).collect(),
        }
    }
}

#[async_trait]
impl TickerInfoProvider for StaticProvider {
    async fn lookup(&self, symbol: &str) -> Result<TickerInfo, LookupError> {
        self.infos
            .get(symbol)
            .cloned()
            .ok_or_else(|| LookupError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}
