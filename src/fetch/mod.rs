//! Static-file data access. The dashboard artefacts are plain files — either
//! served from static hosting (fetched with a cache-busting query parameter)
//! or sitting in a local directory. One trait, two sources.
//!
//! No retries and no backoff: a failed load surfaces as an error for that
//! widget and nothing else.

use crate::apex::ApexProfile;
use crate::config::SourceConfig;
use crate::loader;
use crate::models::{ChartData, DashboardStats, Signal, TickerLookup, TickerMetadata};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid JSON in {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("bad endpoint path {path}: {source}")]
    Endpoint {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// metadata_index.json wrapper.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MetadataIndex {
    pub tickers: Vec<TickerMetadata>,
}

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable dashboard-data source.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn fetch_stats(&self) -> Result<DashboardStats>;
    async fn fetch_lookup(&self) -> Result<TickerLookup>;
    async fn fetch_metadata_index(&self) -> Result<Vec<TickerMetadata>>;
    async fn fetch_signals(&self) -> Result<Vec<Signal>>;
    async fn fetch_ticker_details(&self, ticker: &str) -> Result<TickerMetadata>;
    async fn fetch_chart(&self, ticker: &str) -> Result<ChartData>;
    async fn fetch_apex_profile(&self, ticker: &str) -> Result<ApexProfile>;
}

/// Pick the source from config: a base URL means HTTP, otherwise the local
/// data directory.
pub fn source_from_config(config: &SourceConfig) -> Result<Box<dyn DashboardSource>> {
    match config.base_url.as_deref() {
        Some(base) => Ok(Box::new(HttpSource::new(base, config.timeout_secs)?)),
        None => Ok(Box::new(LocalSource::new(config.data_dir.clone()))),
    }
}

// ── HTTP source ───────────────────────────────────────────────────────────────

pub struct HttpSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid base URL {:?}", base_url))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("crashdash/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    /// `<base>/<path>?v=<unix-millis>` — the cache buster defeats stale CDN
    /// copies of regenerated artefacts.
    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(&format!("{}/{}", self.base_url.path().trim_end_matches('/'), path))
            .map_err(|source| FetchError::Endpoint {
                path: path.to_string(),
                source,
            })?;
        url.set_query(Some(&format!("v={}", Utc::now().timestamp_millis())));
        Ok(url)
    }

    async fn get_text(&self, path: &str) -> Result<String, FetchError> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let body = self.get_text(path).await?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            name: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl DashboardSource for HttpSource {
    async fn fetch_stats(&self) -> Result<DashboardStats> {
        Ok(self.get_json("dashboard_stats.json").await?)
    }

    async fn fetch_lookup(&self) -> Result<TickerLookup> {
        Ok(self.get_json("ticker_lookup.json").await?)
    }

    async fn fetch_metadata_index(&self) -> Result<Vec<TickerMetadata>> {
        let index: MetadataIndex = self.get_json("metadata_index.json").await?;
        if index.tickers.is_empty() {
            warn!("metadata_index.json has no tickers array");
        }
        Ok(index.tickers)
    }

    async fn fetch_signals(&self) -> Result<Vec<Signal>> {
        let body = self.get_text("signals.csv").await?;
        loader::parse_signals_csv(&body)
    }

    async fn fetch_ticker_details(&self, ticker: &str) -> Result<TickerMetadata> {
        Ok(self.get_json(&format!("tickers/{}.json", ticker)).await?)
    }

    async fn fetch_chart(&self, ticker: &str) -> Result<ChartData> {
        Ok(self.get_json(&format!("charts/{}.json", ticker)).await?)
    }

    async fn fetch_apex_profile(&self, ticker: &str) -> Result<ApexProfile> {
        Ok(self
            .get_json(&format!("apex_reports/{}_apex_profile.json", ticker))
            .await?)
    }
}

// ── Local source ──────────────────────────────────────────────────────────────

pub struct LocalSource {
    dir: PathBuf,
}

impl LocalSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn read_json<T: DeserializeOwned>(&self, rel: &str) -> Result<T, FetchError> {
        let path = self.dir.join(rel);
        debug!("Reading {:?}", path);
        let body = std::fs::read_to_string(&path)?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            name: rel.to_string(),
            source,
        })
    }
}

#[async_trait]
impl DashboardSource for LocalSource {
    async fn fetch_stats(&self) -> Result<DashboardStats> {
        Ok(self.read_json("dashboard_stats.json")?)
    }

    async fn fetch_lookup(&self) -> Result<TickerLookup> {
        Ok(self.read_json("ticker_lookup.json")?)
    }

    async fn fetch_metadata_index(&self) -> Result<Vec<TickerMetadata>> {
        let index: MetadataIndex = self.read_json("metadata_index.json")?;
        Ok(index.tickers)
    }

    async fn fetch_signals(&self) -> Result<Vec<Signal>> {
        loader::load_signals_csv(&self.dir.join("signals.csv"))
    }

    async fn fetch_ticker_details(&self, ticker: &str) -> Result<TickerMetadata> {
        Ok(self.read_json(&format!("tickers/{}.json", ticker))?)
    }

    async fn fetch_chart(&self, ticker: &str) -> Result<ChartData> {
        Ok(self.read_json(&format!("charts/{}.json", ticker))?)
    }

    async fn fetch_apex_profile(&self, ticker: &str) -> Result<ApexProfile> {
        Ok(self.read_json(&format!("apex_reports/{}_apex_profile.json", ticker))?)
    }
}
