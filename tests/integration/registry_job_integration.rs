//! End-to-end registry job against mocked SEC and Yahoo endpoints

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::test_data::date;
use stock_registry::api::{LookupError, TickerInfoProvider, YahooClient};
use stock_registry::data_collector::DataCollector;
use stock_registry::models::{CapTier, Config, TickerRecord};

const CRUMB: &str = "Xy7crumb";

fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    Config {
        data_dir: dir.path().join("data"),
        sitemap_path: dir.path().join("sitemap.xml"),
        site_base_url: "https://registry.example.com".to_string(),
        sec_tickers_url: format!("{}/files/company_tickers.json", server.uri()),
        yahoo_base_url: server.uri(),
        yahoo_cookie_url: format!("{}/cookie", server.uri()),
        concurrency: 4,
        lookup_timeout: Duration::from_secs(10),
        ..Config::default()
    }
}

fn quote_summary(exchange: &str, volume: u64, market_cap: f64, sector: &str, name: &str) -> serde_json::Value {
    json!({
        "quoteSummary": {
            "result": [{
                "price": {
                    "exchange": exchange,
                    "shortName": name,
                    "marketCap": {"raw": market_cap, "fmt": "n/a"}
                },
                "summaryDetail": {
                    "averageVolume": {"raw": volume, "fmt": "n/a"}
                },
                "assetProfile": {"sector": sector}
            }],
            "error": null
        }
    })
}

async fn mount_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cookie"))
        .respond_with(ResponseTemplate::new(404).insert_header("set-cookie", "A3=d=session; Path=/"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/test/getcrumb"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CRUMB))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_quote(server: &MockServer, symbol: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/v10/finance/quoteSummary/{}", symbol)))
        .and(query_param("crumb", CRUMB))
        .and(query_param("modules", "price,summaryDetail,assetProfile"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[test_log::test(tokio::test)]
async fn test_full_update_against_mocked_endpoints() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/files/company_tickers.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
            "1": {"cik_str": 1, "ticker": "TINY", "title": "Tiny Corp"},
            "2": {"cik_str": 2, "ticker": "OTCX", "title": "Pink Sheet Co"},
            "3": {"cik_str": 3, "ticker": "BOOM", "title": "Flaky Inc"},
            "4": {"cik_str": 4, "ticker": "GHOST", "title": "Unlisted"}
        })))
        .mount(&server)
        .await;

    mount_session(&server).await;
    mount_quote(&server, "AAPL", ResponseTemplate::new(200)
        .set_body_json(quote_summary("NMS", 55_000_000, 3.4e12, "Technology", "Apple Inc."))).await;
    mount_quote(&server, "TINY", ResponseTemplate::new(200)
        .set_body_json(quote_summary("NCM", 900_000, 20e6, "Healthcare", "Tiny Corp"))).await;
    mount_quote(&server, "OTCX", ResponseTemplate::new(200)
        .set_body_json(quote_summary("PNK", 5_000_000, 1e9, "Energy", "Pink Sheet Co"))).await;
    mount_quote(&server, "BOOM", ResponseTemplate::new(500).set_body_string("upstream exploded")).await;
    mount_quote(&server, "GHOST", ResponseTemplate::new(404).set_body_json(json!({
        "quoteSummary": {"result": null, "error": {"code": "Not Found", "description": "Quote not found"}}
    }))).await;

    let config = test_config(&server, &dir);
    let collector = DataCollector::from_config(&config).unwrap();
    let summary = collector.run(date(2025, 5, 1)).await.expect("run failed");

    assert_eq!(summary.universe_size, 2);
    assert_eq!(summary.added, vec!["AAPL", "TINY"]);
    assert!(summary.removed.is_empty());

    let records: Vec<TickerRecord> = collector.registry().load_active().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ticker, "AAPL");
    assert_eq!(records[0].cap_tier, CapTier::Mega);
    assert_eq!(records[0].name, "Apple Inc.");
    assert_eq!(records[1].ticker, "TINY");
    assert_eq!(records[1].cap_tier, CapTier::Nano);
    assert_eq!(records[1].exchange, "NCM");

    let sitemap = std::fs::read_to_string(dir.path().join("sitemap.xml")).unwrap();
    assert!(sitemap.contains("<loc>https://registry.example.com/data/active_tickers.json</loc><lastmod>2025-05-01</lastmod>"));
    assert!(dir.path().join("data/archive/universe_2025-05-01.csv").exists());
}

#[test_log::test(tokio::test)]
async fn test_master_list_failure_aborts_without_writing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/files/company_tickers.json"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Undeclared Automated Tool"))
        .mount(&server)
        .await;

    let config = test_config(&server, &dir);
    let collector = DataCollector::from_config(&config).unwrap();
    let result = collector.run(date(2025, 5, 2)).await;

    assert!(result.is_err());
    assert!(!dir.path().join("data").exists());
    assert!(!dir.path().join("sitemap.xml").exists());
}

#[test_log::test(tokio::test)]
async fn test_missing_crumb_is_a_lookup_failure() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/test/getcrumb"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = YahooClient::new(&test_config(&server, &dir)).unwrap();
    assert_matches!(client.lookup("AAPL").await, Err(LookupError::Crumb(_)));
}
