//! In-memory signal store: holds the loaded signal rows, per-ticker metadata
//! and the ticker lookup table, and exposes grouping, filtering and sorting
//! over them. One implementation serves every dashboard view — the compact
//! and full renderings are presentation concerns layered on top.

use crate::derive::{self, MarketCapBand};
use crate::models::{
    DashboardStats, Signal, SignalColor, TickerInfo, TickerLookup, TickerMetadata,
};
use chrono::{Local, Months, NaiveDate};
use std::cmp::Ordering;
use std::collections::HashMap;

// ── Grouping ──────────────────────────────────────────────────────────────────

/// All of one ticker's signals: the first row seen in input order is `latest`
/// (the feed is written newest-first), the rest become history.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerGroup {
    pub ticker: String,
    pub latest: Signal,
    pub history: Vec<Signal>,
    pub count: usize,
}

/// Partition signals by ticker, preserving first-encounter order of groups.
/// Grouping trusts caller ordering for `latest`; only the history tail is
/// re-sorted newest-first.
pub fn group_by_ticker(signals: &[Signal]) -> Vec<TickerGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut by_ticker: HashMap<String, Vec<&Signal>> = HashMap::new();

    for signal in signals {
        let entry = by_ticker.entry(signal.ticker.clone()).or_default();
        if entry.is_empty() {
            order.push(signal.ticker.clone());
        }
        entry.push(signal);
    }

    order
        .into_iter()
        .map(|ticker| {
            let rows = by_ticker.remove(&ticker).unwrap_or_default();
            let latest = rows[0].clone();
            let mut history: Vec<Signal> = rows[1..].iter().map(|s| (*s).clone()).collect();
            history.sort_by(|a, b| b.date.cmp(&a.date));
            let count = rows.len();
            TickerGroup {
                ticker,
                latest,
                history,
                count,
            }
        })
        .collect()
}

// ── Filtering ─────────────────────────────────────────────────────────────────

/// Fixed lookback windows subtract calendar months from the reference date,
/// not a day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DateWindow {
    #[default]
    #[value(name = "all")]
    AllTime,
    #[value(name = "1m")]
    OneMonth,
    #[value(name = "3m")]
    ThreeMonths,
    #[value(name = "6m")]
    SixMonths,
    #[value(name = "1y")]
    OneYear,
}

impl DateWindow {
    pub fn cutoff(self, today: NaiveDate) -> Option<NaiveDate> {
        let months = match self {
            DateWindow::AllTime => return None,
            DateWindow::OneMonth => 1,
            DateWindow::ThreeMonths => 3,
            DateWindow::SixMonths => 6,
            DateWindow::OneYear => 12,
        };
        Some(today.checked_sub_months(Months::new(months)).unwrap_or(today))
    }
}

/// Independent conjunctive predicates; an unset value always matches.
#[derive(Debug, Clone, Default)]
pub struct SignalFilter {
    pub search: Option<String>,
    pub color: Option<SignalColor>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    /// `EXCHANGE-MARKET` pair, e.g. "LSE-AIM" or "AQUIS-MAIN".
    pub market: Option<String>,
    pub cap_band: Option<MarketCapBand>,
    /// Policy for a cap-band filter meeting a ticker with no resolvable
    /// market cap. Default: exclude.
    pub include_unknown_market_cap: bool,
    pub window: DateWindow,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Reference date for lookback windows; `None` means today.
    pub reference_date: Option<NaiveDate>,
}

// ── Sorting ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortKey {
    Ticker,
    #[default]
    Date,
    Severity,
    AiScore,
    CurrentPnl,
    BestRally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Two-key severity comparator: color rank first, then signal-type text.
/// Symmetric on both operands.
fn severity_cmp(a: &Signal, b: &Signal) -> Ordering {
    a.color
        .rank()
        .cmp(&b.color.rank())
        .then_with(|| a.signal_type.cmp(&b.signal_type))
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SignalStore {
    pub signals: Vec<Signal>,
    pub metadata: HashMap<String, TickerMetadata>,
    pub lookup: TickerLookup,
    pub stats: DashboardStats,
}

impl SignalStore {
    pub fn new(
        signals: Vec<Signal>,
        metadata_index: Vec<TickerMetadata>,
        lookup: TickerLookup,
        stats: DashboardStats,
    ) -> Self {
        let mut metadata = HashMap::new();
        for meta in metadata_index {
            if let Some(ticker) = meta.ticker.clone() {
                metadata.insert(ticker, meta);
            }
        }
        Self {
            signals,
            metadata,
            lookup,
            stats,
        }
    }

    pub fn metadata_for(&self, ticker: &str) -> Option<&TickerMetadata> {
        self.metadata.get(ticker)
    }

    pub fn info_for(&self, ticker: &str) -> Option<&TickerInfo> {
        self.lookup.tickers.get(ticker)
    }

    pub fn company_name(&self, ticker: &str) -> Option<&str> {
        self.info_for(ticker).and_then(|i| i.name.as_deref())
    }

    /// True until tickers/<ticker>.json has been merged in.
    pub fn needs_details(&self, ticker: &str) -> bool {
        !self
            .metadata
            .get(ticker)
            .map(|m| m.full_details_loaded)
            .unwrap_or(false)
    }

    /// Union-merge a lazily fetched full record into the summary cache.
    pub fn insert_details(&mut self, ticker: &str, full: TickerMetadata) {
        self.metadata
            .entry(ticker.to_string())
            .or_default()
            .merge_full(full);
    }

    pub fn market_cap(&self, ticker: &str) -> Option<f64> {
        derive::resolve_market_cap(self.metadata_for(ticker), self.info_for(ticker))
    }

    /// Unrealized P&L for a signal row: the generator's pre-computed value
    /// when present, otherwise entry price vs latest known price.
    pub fn current_pnl(&self, signal: &Signal) -> Option<f64> {
        let meta = self.metadata_for(&signal.ticker);
        if let Some(pnl) = derive::coerce_finite(
            meta.and_then(|m| m.latest_signal.as_ref())
                .and_then(|l| l.current_pnl_pct),
        ) {
            return Some(pnl);
        }
        let current = meta.and_then(|m| m.current_price);
        derive::compute_pnl(signal.price, current)
    }

    pub fn best_rally(&self, ticker: &str) -> Option<f64> {
        let meta = self.metadata_for(ticker)?;
        derive::coerce_finite(meta.best_rally_pct).or_else(|| {
            derive::coerce_finite(meta.stats.as_ref().and_then(|s| s.best_rally_pct))
        })
    }

    // ── Filtering ─────────────────────────────────────────────────────────────

    pub fn filter_signals(&self, filter: &SignalFilter) -> Vec<Signal> {
        let search = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let today = filter
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive());
        let cutoff = filter.window.cutoff(today);

        self.signals
            .iter()
            .filter(|s| self.matches(s, filter, search.as_deref(), cutoff))
            .cloned()
            .collect()
    }

    fn matches(
        &self,
        signal: &Signal,
        filter: &SignalFilter,
        search: Option<&str>,
        cutoff: Option<NaiveDate>,
    ) -> bool {
        let info = self.info_for(&signal.ticker);

        if let Some(term) = search {
            let ticker_hit = signal.ticker.to_lowercase().contains(term);
            let name_hit = info
                .and_then(|i| i.name.as_deref())
                .map(|n| n.to_lowercase().contains(term))
                .unwrap_or(false);
            if !ticker_hit && !name_hit {
                return false;
            }
        }

        if let Some(color) = filter.color {
            if signal.color != color {
                return false;
            }
        }

        if let Some(sector) = filter.sector.as_deref() {
            if info.and_then(|i| i.sector.as_deref()) != Some(sector) {
                return false;
            }
        }

        if let Some(industry) = filter.industry.as_deref() {
            if info.and_then(|i| i.industry.as_deref()) != Some(industry) {
                return false;
            }
        }

        if let Some(market) = filter.market.as_deref() {
            let pair = format!("{}-{}", signal.exchange_or_default(), signal.market_or_default());
            if !pair.eq_ignore_ascii_case(market) {
                return false;
            }
        }

        if let Some(band) = filter.cap_band {
            match self.market_cap(&signal.ticker) {
                Some(mc) => {
                    if MarketCapBand::classify(mc) != band {
                        return false;
                    }
                }
                None => {
                    if !filter.include_unknown_market_cap {
                        return false;
                    }
                }
            }
        }

        if let Some(cutoff) = cutoff {
            if signal.date < cutoff {
                return false;
            }
        }
        if let Some(from) = filter.from {
            if signal.date < from {
                return false;
            }
        }
        if let Some(to) = filter.to {
            if signal.date > to {
                return false;
            }
        }

        true
    }

    // ── Sorting ───────────────────────────────────────────────────────────────

    pub fn sort_signals(&self, signals: &mut [Signal], key: SortKey, dir: SortDirection) {
        signals.sort_by(|a, b| dir.apply(self.signal_cmp(a, b, key)));
    }

    fn signal_cmp(&self, a: &Signal, b: &Signal, key: SortKey) -> Ordering {
        match key {
            SortKey::Ticker => a.ticker.cmp(&b.ticker),
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::Severity => severity_cmp(a, b),
            SortKey::AiScore => num_cmp(a.ai_score, b.ai_score),
            SortKey::CurrentPnl => num_cmp(self.current_pnl(a), self.current_pnl(b)),
            SortKey::BestRally => num_cmp(self.best_rally(&a.ticker), self.best_rally(&b.ticker)),
        }
    }

    /// Grouped view ordering: AI score uses the group maximum, P&L and date
    /// use the latest signal.
    pub fn sort_groups(&self, groups: &mut [TickerGroup], key: SortKey, dir: SortDirection) {
        groups.sort_by(|a, b| dir.apply(self.group_cmp(a, b, key)));
    }

    fn group_cmp(&self, a: &TickerGroup, b: &TickerGroup, key: SortKey) -> Ordering {
        match key {
            SortKey::Ticker => a.ticker.cmp(&b.ticker),
            SortKey::Date => a.latest.date.cmp(&b.latest.date),
            SortKey::Severity => severity_cmp(&a.latest, &b.latest),
            SortKey::AiScore => num_cmp(group_max_score(a), group_max_score(b)),
            SortKey::CurrentPnl => {
                num_cmp(self.current_pnl(&a.latest), self.current_pnl(&b.latest))
            }
            SortKey::BestRally => {
                num_cmp(self.best_rally(&a.ticker), self.best_rally(&b.ticker))
            }
        }
    }
}

fn group_max_score(group: &TickerGroup) -> Option<f64> {
    std::iter::once(&group.latest)
        .chain(group.history.iter())
        .filter_map(|s| s.ai_score)
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

/// Missing values sort as 0, matching the dashboard's `|| 0` defaulting.
fn num_cmp(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.unwrap_or(0.0).total_cmp(&b.unwrap_or(0.0))
}
