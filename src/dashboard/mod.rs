//! Load orchestration: ties the data source → store together.
//!
//! The four bulk artefacts (stats, ticker lookup, metadata index, signals
//! CSV) are independent and fetched concurrently; any single failure aborts
//! the load visibly rather than rendering from partial data. Per-ticker full
//! details are fetched lazily on first use and memoized in the store.

use crate::fetch::DashboardSource;
use crate::models::TickerMetadata;
use crate::store::SignalStore;
use anyhow::{Context, Result};
use tracing::{debug, info};

pub struct Dashboard {
    source: Box<dyn DashboardSource>,
    pub store: SignalStore,
}

impl Dashboard {
    pub async fn load(source: Box<dyn DashboardSource>) -> Result<Dashboard> {
        let (stats, lookup, metadata_index, signals) = tokio::try_join!(
            source.fetch_stats(),
            source.fetch_lookup(),
            source.fetch_metadata_index(),
            source.fetch_signals(),
        )
        .context("Dashboard data load failed")?;

        info!(
            "Loaded {} signals, {} tickers in lookup, metadata for {}",
            signals.len(),
            lookup.tickers.len(),
            metadata_index.len()
        );

        let store = SignalStore::new(signals, metadata_index, lookup, stats);
        Ok(Dashboard { source, store })
    }

    /// Full per-ticker metadata, fetched once and merged into the summary
    /// cache. A fetch failure leaves the summary record usable.
    pub async fn ticker_details(&mut self, ticker: &str) -> Result<&TickerMetadata> {
        if self.store.needs_details(ticker) {
            match self.source.fetch_ticker_details(ticker).await {
                Ok(full) => self.store.insert_details(ticker, full),
                Err(e) => debug!("No full details for {}: {:#}", ticker, e),
            }
        }
        self.store
            .metadata_for(ticker)
            .with_context(|| format!("No metadata for {}", ticker))
    }

    pub async fn chart(&self, ticker: &str) -> Result<crate::models::ChartData> {
        self.source
            .fetch_chart(ticker)
            .await
            .with_context(|| format!("Chart load failed for {}", ticker))
    }

    pub async fn apex_profile(&self, ticker: &str) -> Result<crate::apex::ApexProfile> {
        self.source
            .fetch_apex_profile(ticker)
            .await
            .with_context(|| format!("APEX profile load failed for {}", ticker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apex::ApexProfile;
    use crate::models::{
        ChartData, DashboardStats, PerfStats, Signal, SignalColor, TickerLookup,
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeSource {
        detail_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DashboardSource for FakeSource {
        async fn fetch_stats(&self) -> Result<DashboardStats> {
            Ok(DashboardStats::default())
        }

        async fn fetch_lookup(&self) -> Result<TickerLookup> {
            Ok(TickerLookup::default())
        }

        async fn fetch_metadata_index(&self) -> Result<Vec<TickerMetadata>> {
            Ok(vec![TickerMetadata {
                ticker: Some("ABC.L".into()),
                best_rally_pct: Some(10.0),
                ..Default::default()
            }])
        }

        async fn fetch_signals(&self) -> Result<Vec<Signal>> {
            Ok(vec![Signal {
                ticker: "ABC.L".into(),
                date: "2024-01-10".parse().unwrap(),
                signal_type: "CRASH ZONE".into(),
                color: SignalColor::Yellow,
                price: Some(10.0),
                ai_score: None,
                drawdown_pct: None,
                exchange: None,
                market: None,
            }])
        }

        async fn fetch_ticker_details(&self, _ticker: &str) -> Result<TickerMetadata> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            Ok(TickerMetadata {
                ticker: Some("ABC.L".into()),
                stats: Some(PerfStats {
                    win_rate_pct: Some(60.0),
                    ..Default::default()
                }),
                ..Default::default()
            })
        }

        async fn fetch_chart(&self, _ticker: &str) -> Result<ChartData> {
            Err(anyhow!("no chart"))
        }

        async fn fetch_apex_profile(&self, _ticker: &str) -> Result<ApexProfile> {
            Ok(ApexProfile::default())
        }
    }

    #[tokio::test]
    async fn detail_fetch_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FakeSource {
            detail_calls: Arc::clone(&calls),
        };
        let mut dash = Dashboard::load(Box::new(source)).await.unwrap();

        let meta = dash.ticker_details("ABC.L").await.unwrap();
        assert!(meta.stats.is_some());
        assert_eq!(meta.best_rally_pct, Some(10.0)); // summary field survives

        dash.ticker_details("ABC.L").await.unwrap();
        dash.ticker_details("ABC.L").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
