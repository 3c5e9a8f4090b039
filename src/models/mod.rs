use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ── Signal color ──────────────────────────────────────────────────────────────

/// Severity tag carried by every signal. PURPLE outranks everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalColor {
    Purple,
    Red,
    Orange,
    Green,
    Yellow,
}

impl SignalColor {
    /// Fixed total order used for severity sorting (PURPLE=5 … YELLOW=1).
    pub fn rank(self) -> u8 {
        match self {
            SignalColor::Purple => 5,
            SignalColor::Red => 4,
            SignalColor::Orange => 3,
            SignalColor::Green => 2,
            SignalColor::Yellow => 1,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PURPLE" => Some(SignalColor::Purple),
            "RED" => Some(SignalColor::Red),
            "ORANGE" => Some(SignalColor::Orange),
            "GREEN" => Some(SignalColor::Green),
            "YELLOW" => Some(SignalColor::Yellow),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalColor::Purple => "PURPLE",
            SignalColor::Red => "RED",
            SignalColor::Orange => "ORANGE",
            SignalColor::Green => "GREEN",
            SignalColor::Yellow => "YELLOW",
        }
    }

    /// Base crash color implied by the signal-type text, independent of the
    /// stored color (which is PURPLE for enhanced combos).
    pub fn base_from_type(signal_type: &str) -> SignalColor {
        let upper = signal_type.to_uppercase();
        if upper.contains("ULTRA") {
            SignalColor::Red
        } else if upper.contains("EXTREME") {
            SignalColor::Orange
        } else if upper.contains("DEEP") {
            SignalColor::Green
        } else {
            // "CRASH ZONE" / "CRASH" / anything else
            SignalColor::Yellow
        }
    }
}

impl fmt::Display for SignalColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Signal ────────────────────────────────────────────────────────────────────

/// One detected crash event. Rows missing ticker, date or color never make it
/// past the loader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub ticker: String,
    pub date: NaiveDate,
    pub signal_type: String,
    pub color: SignalColor,
    pub price: Option<f64>,
    pub ai_score: Option<f64>,
    pub drawdown_pct: Option<f64>,
    pub exchange: Option<String>, // LSE, AQUIS
    pub market: Option<String>,   // AIM, MAIN
}

impl Signal {
    /// "ENHANCED" modifier in the type text upgrades the badge, not the type.
    pub fn is_enhanced(&self) -> bool {
        self.signal_type.to_uppercase().contains("ENHANCED")
    }

    /// Exchange defaults follow the feed: unlabelled rows are LSE AIM.
    pub fn exchange_or_default(&self) -> &str {
        self.exchange.as_deref().unwrap_or("LSE")
    }

    pub fn market_or_default(&self) -> &str {
        self.market.as_deref().unwrap_or("AIM")
    }
}

/// Raw signals.csv row, one string per column, everything optional.
#[derive(Debug, Clone, Default)]
pub struct RawSignalRow {
    pub ticker: Option<String>,
    pub date: Option<String>,
    pub signal_type: Option<String>,
    pub color: Option<String>,
    pub price: Option<String>,
    pub ai_score: Option<String>,
    pub drawdown_pct: Option<String>,
    pub exchange: Option<String>,
    pub market: Option<String>,
}

// ── Ticker metadata (summary + full) ──────────────────────────────────────────
//
// The generator's JSON is optional at every level; no field is guaranteed.
// Unknown keys are preserved so the lazy full-detail merge is a true union.

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TickerMetadata {
    pub ticker: Option<String>,
    pub company_info: Option<CompanyInfo>,
    pub basics: Option<Basics>,
    pub latest_signal: Option<LatestSignal>,
    pub best_historical_signal: Option<BestHistoricalSignal>,
    pub stats: Option<PerfStats>,
    pub split_risk: Option<SplitRisk>,
    pub risk_flags: Option<Vec<String>>,
    pub splits: Option<Vec<StockSplit>>,
    pub all_historical_signals: Option<Vec<HistoricalSignal>>,
    pub current_price: Option<f64>,
    pub best_rally_pct: Option<f64>,
    pub lse_ticker: Option<String>,
    pub exchange: Option<String>,
    pub market: Option<String>,
    /// Set once tickers/<ticker>.json has been merged in; prevents re-fetching.
    #[serde(skip)]
    pub full_details_loaded: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
    pub market: Option<String>,
    pub currency: Option<String>,
    pub current_market_cap: Option<f64>,
    pub current_market_cap_pence: Option<f64>,
    pub market_cap_gbp: Option<f64>,
    pub current_close_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Basics {
    pub current_price: Option<f64>,
    pub current_price_pence: Option<f64>,
    pub ath: Option<f64>,
    pub ath_pence: Option<f64>,
    pub ath_date: Option<String>,
    pub atl: Option<f64>,
    pub atl_pence: Option<f64>,
    pub atl_date: Option<String>,
    pub drawdown_from_ath_pct: Option<f64>,
    pub data_start: Option<String>,
    pub data_end: Option<String>,
    pub total_bars: Option<u64>,
    pub lse_ticker: Option<String>,
    pub exchange: Option<String>,
    pub market: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LatestSignal {
    pub date: Option<String>,
    pub price: Option<f64>,
    pub price_pence: Option<f64>,
    pub rsi: Option<f64>,
    pub cycle_position: Option<f64>,
    pub holding_period_days: Option<i64>,
    pub current_pnl_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BestHistoricalSignal {
    pub signal_date: Option<String>,
    pub entry_price: Option<f64>,
    pub entry_price_pence: Option<f64>,
    pub peak_price: Option<f64>,
    pub peak_price_pence: Option<f64>,
    pub rally_pct: Option<f64>,
    pub days_to_peak: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerfStats {
    pub total_signals: Option<u64>,
    pub win_rate_pct: Option<f64>,
    pub avg_rally_pct: Option<f64>,
    pub median_rally_pct: Option<f64>,
    pub best_rally_pct: Option<f64>,
    pub worst_rally_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitRisk {
    pub split_detected: Option<bool>,
    pub split_date: Option<String>,
    pub split_type: Option<String>,
    pub split_description: Option<String>,
    pub days_from_split: Option<i64>,
    pub risk_level: Option<String>,
    pub confidence: Option<String>,
    pub warning: Option<String>,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StockSplit {
    pub date: Option<String>,
    pub ratio: Option<String>,
    pub ratio_value: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoricalSignal {
    pub date: Option<String>,
    pub signal_type: Option<String>,
    pub color: Option<String>,
    pub entry_price: Option<f64>,
    pub rally_pct: Option<f64>,
    pub outcome: Option<String>,
}

impl TickerMetadata {
    /// Union-merge lazily fetched full details into this summary record.
    /// Full-version fields win on collision; summary fields survive where the
    /// full version is silent.
    pub fn merge_full(&mut self, full: TickerMetadata) {
        macro_rules! take_if_some {
            ($($field:ident),* $(,)?) => {
                $( if full.$field.is_some() { self.$field = full.$field; } )*
            };
        }
        take_if_some!(
            ticker,
            company_info,
            basics,
            latest_signal,
            best_historical_signal,
            stats,
            split_risk,
            risk_flags,
            splits,
            all_historical_signals,
            current_price,
            best_rally_pct,
            lse_ticker,
            exchange,
            market,
        );
        for (k, v) in full.extra {
            self.extra.insert(k, v);
        }
        self.full_details_loaded = true;
    }
}

// ── Ticker lookup ─────────────────────────────────────────────────────────────

/// ticker_lookup.json: static map plus dropdown vocab.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerLookup {
    pub tickers: HashMap<String, TickerInfo>,
    pub sectors: Vec<String>,
    pub industries: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TickerInfo {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub market_cap_pence: Option<f64>,
}

// ── Dashboard stats ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub total_signals: Option<u64>,
    pub signal_colors: HashMap<String, u64>,
    pub latest_scan_date: Option<String>,
    pub generated: Option<String>,
}

// ── Chart payload ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartData {
    pub candles: Vec<OhlcBar>,
    pub markers: Vec<SignalMarker>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OhlcBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalMarker {
    pub date: Option<String>,
    pub price: Option<f64>,
    pub color: Option<String>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_rank_orders_purple_first() {
        assert!(SignalColor::Purple.rank() > SignalColor::Red.rank());
        assert!(SignalColor::Red.rank() > SignalColor::Orange.rank());
        assert!(SignalColor::Orange.rank() > SignalColor::Green.rank());
        assert!(SignalColor::Green.rank() > SignalColor::Yellow.rank());
    }

    #[test]
    fn base_color_from_type_text() {
        assert_eq!(SignalColor::base_from_type("ULTRA CRASH"), SignalColor::Red);
        assert_eq!(SignalColor::base_from_type("Extreme Crash"), SignalColor::Orange);
        assert_eq!(SignalColor::base_from_type("DEEP VALUE"), SignalColor::Green);
        assert_eq!(SignalColor::base_from_type("CRASH ZONE"), SignalColor::Yellow);
        assert_eq!(SignalColor::base_from_type("something else"), SignalColor::Yellow);
    }

    #[test]
    fn merge_full_prefers_full_fields_and_keeps_summary() {
        let mut summary = TickerMetadata {
            ticker: Some("ABC.L".into()),
            best_rally_pct: Some(12.0),
            current_price: Some(1.5),
            ..Default::default()
        };
        let full = TickerMetadata {
            best_rally_pct: Some(40.0),
            stats: Some(PerfStats {
                total_signals: Some(7),
                ..Default::default()
            }),
            ..Default::default()
        };
        summary.merge_full(full);
        assert_eq!(summary.best_rally_pct, Some(40.0));
        assert_eq!(summary.current_price, Some(1.5)); // full was silent
        assert_eq!(summary.stats.unwrap().total_signals, Some(7));
        assert!(summary.full_details_loaded);
    }

    #[test]
    fn metadata_tolerates_totally_empty_json() {
        let meta: TickerMetadata = serde_json::from_str("{}").unwrap();
        assert!(meta.company_info.is_none());
        assert!(meta.all_historical_signals.is_none());
    }
}
