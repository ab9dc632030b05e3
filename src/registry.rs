//! Registry persistence: snapshot, changelog, archive and sitemap.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::models::{ChangelogEntry, Config, TickerRecord};

/// Number of runs kept in the changelog
pub const HISTORY_LIMIT: usize = 24;

const ACTIVE_JSON: &str = "active_tickers.json";
const ACTIVE_CSV: &str = "active_tickers.csv";
const CHANGELOG_JSON: &str = "changelog.json";
const CHANGELOG_CSV: &str = "changelog.csv";
const ARCHIVE_DIR: &str = "archive";

/// (path, priority) pairs published in the sitemap
const SITEMAP_PAGES: [(&str, &str); 4] = [
    ("/", "1.0"),
    ("/data/", "0.8"),
    ("/data/active_tickers.json", "0.9"),
    ("/data/changelog.json", "0.6"),
];

/// Summary of one registry update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSummary {
    pub date: NaiveDate,
    pub universe_size: usize,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub history_len: usize,
}

/// Flat-file registry rooted at a data directory
#[derive(Debug, Clone)]
pub struct Registry {
    data_dir: PathBuf,
    sitemap_path: PathBuf,
    site_base_url: String,
}

impl Registry {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        sitemap_path: impl Into<PathBuf>,
        site_base_url: impl Into<String>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            sitemap_path: sitemap_path.into(),
            site_base_url: site_base_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.data_dir, &config.sitemap_path, &config.site_base_url)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn active_json_path(&self) -> PathBuf {
        self.data_dir.join(ACTIVE_JSON)
    }

    pub fn changelog_json_path(&self) -> PathBuf {
        self.data_dir.join(CHANGELOG_JSON)
    }

    pub fn archive_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(ARCHIVE_DIR)
            .join(format!("universe_{}.csv", date.format("%Y-%m-%d")))
    }

    /// Records from the last snapshot, or empty if none was written yet
    pub fn load_active(&self) -> Result<Vec<TickerRecord>> {
        read_json_or_default(&self.active_json_path())
    }

    /// Ticker set of the last snapshot
    pub fn load_active_set(&self) -> Result<BTreeSet<String>> {
        Ok(self.load_active()?.into_iter().map(|r| r.ticker).collect())
    }

    /// Changelog history, newest first
    pub fn load_changelog(&self) -> Result<Vec<ChangelogEntry>> {
        read_json_or_default(&self.changelog_json_path())
    }

    /// Diff today's records against the stored snapshot and write every artifact
    pub fn update(&self, date: NaiveDate, records: &[TickerRecord]) -> Result<UpdateSummary> {
        let old_tickers = self.load_active_set()?;
        let new_tickers: BTreeSet<String> = records.iter().map(|r| r.ticker.clone()).collect();

        let (added, removed) = compute_churn(&old_tickers, &new_tickers);
        info!("🔄 Churn for {}: {} added, {} removed", date, added.len(), removed.len());

        let mut history = self.load_changelog()?;
        let entry = ChangelogEntry::new(date, added, removed);
        let summary_added = entry.added.clone();
        let summary_removed = entry.removed.clone();
        prepend_entry(&mut history, entry, HISTORY_LIMIT);

        fs::create_dir_all(self.data_dir.join(ARCHIVE_DIR))
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;

        // Churn lands before the snapshot so a partial run never loses a day
        write_json(&self.changelog_json_path(), &history)?;
        write_changelog_csv(&self.data_dir.join(CHANGELOG_CSV), &history)?;
        write_json(&self.active_json_path(), records)?;
        write_records_csv(&self.data_dir.join(ACTIVE_CSV), records)?;
        write_records_csv(&self.archive_path(date), records)?;
        self.write_sitemap(date)?;

        info!("💾 Registry written to {}", self.data_dir.display());

        Ok(UpdateSummary {
            date,
            universe_size: new_tickers.len(),
            added: summary_added,
            removed: summary_removed,
            history_len: history.len(),
        })
    }

    fn write_sitemap(&self, date: NaiveDate) -> Result<()> {
        if let Some(parent) = self.sitemap_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let xml = render_sitemap(&self.site_base_url, date);
        fs::write(&self.sitemap_path, xml)
            .with_context(|| format!("failed to write {}", self.sitemap_path.display()))
    }
}

/// `(added, removed)` = `(new - old, old - new)`
pub fn compute_churn(
    old: &BTreeSet<String>,
    new: &BTreeSet<String>,
) -> (BTreeSet<String>, BTreeSet<String>) {
    let added = new.difference(old).cloned().collect();
    let removed = old.difference(new).cloned().collect();
    (added, removed)
}

/// Put `entry` at the front and keep at most `limit` entries
pub fn prepend_entry(history: &mut Vec<ChangelogEntry>, entry: ChangelogEntry, limit: usize) {
    history.insert(0, entry);
    history.truncate(limit);
}

pub fn render_sitemap(base_url: &str, date: NaiveDate) -> String {
    let base = base_url.trim_end_matches('/');
    let lastmod = date.format("%Y-%m-%d");

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (page, priority) in SITEMAP_PAGES {
        xml.push_str(&format!(
            "  <url><loc>{}{}</loc><lastmod>{}</lastmod><priority>{}</priority></url>\n",
            escape_xml(base),
            page,
            lastmod,
            priority
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn read_json_or_default<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Pretty-print with four-space indentation, replacing `path` atomically
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut tmp, formatter);
    value.serialize(&mut serializer)?;
    tmp.flush()?;

    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn write_records_csv(path: &Path, records: &[TickerRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    if records.is_empty() {
        writer.write_record(["ticker", "name", "sector", "cap_tier", "avg_volume", "exchange"])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Changelog row with the ticker lists joined by `;`
#[derive(Debug, Serialize)]
struct ChangelogRow {
    date: String,
    added_count: usize,
    removed_count: usize,
    added: String,
    removed: String,
}

impl From<&ChangelogEntry> for ChangelogRow {
    fn from(entry: &ChangelogEntry) -> Self {
        Self {
            date: entry.date.format("%Y-%m-%d").to_string(),
            added_count: entry.added_count,
            removed_count: entry.removed_count,
            added: entry.added.join(";"),
            removed: entry.removed.join(";"),
        }
    }
}

fn write_changelog_csv(path: &Path, history: &[ChangelogEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    if history.is_empty() {
        writer.write_record(["date", "added_count", "removed_count", "added", "removed"])?;
    }
    for entry in history {
        writer.serialize(ChangelogRow::from(entry))?;
    }
    writer.flush()?;
    Ok(())
}
