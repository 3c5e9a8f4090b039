//! Derived-metric policy: pence vs GBP normalization, market-cap resolution,
//! unrealized P&L and market-cap bucketing.
//!
//! All numeric coercion here is total — a missing or non-finite input yields
//! `None`, never a panic, NaN or Infinity.

use crate::models::{Basics, BestHistoricalSignal, CompanyInfo, LatestSignal, TickerInfo, TickerMetadata};

/// True when the ticker carries the London listing marker, which means the
/// feed quotes its prices in pence (minor units).
pub fn is_minor_unit(ticker: &str) -> bool {
    ticker.trim().to_uppercase().ends_with(".L")
}

/// Coerce to a finite number. `None`, NaN and infinities all collapse to `None`.
pub fn coerce_finite(v: Option<f64>) -> Option<f64> {
    v.filter(|n| n.is_finite())
}

/// A price-like field together with its pence-denominated sibling, replacing
/// the feed's `<field>_pence` naming convention with a statically-typed pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceQuote {
    pub major: Option<f64>,
    pub pence: Option<f64>,
}

impl PriceQuote {
    pub fn new(major: Option<f64>, pence: Option<f64>) -> Self {
        Self { major, pence }
    }
}

/// Resolve a quote to major units: for minor-unit tickers a finite pence value
/// wins and is divided by 100; otherwise the major field is coerced as-is.
pub fn resolve_price(ticker: &str, quote: PriceQuote) -> Option<f64> {
    if is_minor_unit(ticker) {
        if let Some(p) = coerce_finite(quote.pence) {
            return Some(p / 100.0);
        }
    }
    coerce_finite(quote.major)
}

// Quote accessors — one per price-like field the dashboard displays.

impl Basics {
    pub fn current_price_quote(&self) -> PriceQuote {
        PriceQuote::new(self.current_price, self.current_price_pence)
    }

    pub fn ath_quote(&self) -> PriceQuote {
        PriceQuote::new(self.ath, self.ath_pence)
    }

    pub fn atl_quote(&self) -> PriceQuote {
        PriceQuote::new(self.atl, self.atl_pence)
    }
}

impl LatestSignal {
    pub fn price_quote(&self) -> PriceQuote {
        PriceQuote::new(self.price, self.price_pence)
    }
}

impl BestHistoricalSignal {
    pub fn entry_price_quote(&self) -> PriceQuote {
        PriceQuote::new(self.entry_price, self.entry_price_pence)
    }

    pub fn peak_price_quote(&self) -> PriceQuote {
        PriceQuote::new(self.peak_price, self.peak_price_pence)
    }
}

/// Market-cap candidate chain, in feed priority order:
/// lookup pence, company pence, company GBP, lookup GBP. Pence candidates are
/// divided by 100 unconditionally — the feed only emits them for LSE names.
pub fn resolve_market_cap(
    metadata: Option<&TickerMetadata>,
    ticker_info: Option<&TickerInfo>,
) -> Option<f64> {
    let company: Option<&CompanyInfo> = metadata.and_then(|m| m.company_info.as_ref());

    if let Some(p) = coerce_finite(ticker_info.and_then(|t| t.market_cap_pence)) {
        return Some(p / 100.0);
    }
    if let Some(p) = coerce_finite(company.and_then(|c| c.current_market_cap_pence)) {
        return Some(p / 100.0);
    }
    if let Some(n) = coerce_finite(company.and_then(|c| c.current_market_cap)) {
        return Some(n);
    }
    coerce_finite(ticker_info.and_then(|t| t.market_cap))
}

/// Unrealized return since entry, in percent. A missing current price falls
/// back to the entry itself (0%). A missing, non-finite or non-positive entry
/// price makes the P&L unavailable rather than Infinity.
pub fn compute_pnl(entry: Option<f64>, current: Option<f64>) -> Option<f64> {
    let entry = coerce_finite(entry).filter(|e| *e > 0.0)?;
    let current = coerce_finite(current).unwrap_or(entry);
    Some((current - entry) / entry * 100.0)
}

// ── Market-cap buckets ────────────────────────────────────────────────────────

/// Seven fixed bands over major currency units. Lower bound inclusive:
/// exactly 5,000,000 lands in 5–20M.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum MarketCapBand {
    #[value(name = "sub-1m")]
    Sub1M,
    #[value(name = "1-5m")]
    M1To5,
    #[value(name = "5-20m")]
    M5To20,
    #[value(name = "20-50m")]
    M20To50,
    #[value(name = "50-100m")]
    M50To100,
    #[value(name = "100-250m")]
    M100To250,
    #[value(name = "250m-plus")]
    M250Plus,
}

impl MarketCapBand {
    pub fn classify(market_cap: f64) -> MarketCapBand {
        const M: f64 = 1_000_000.0;
        if market_cap < 1.0 * M {
            MarketCapBand::Sub1M
        } else if market_cap < 5.0 * M {
            MarketCapBand::M1To5
        } else if market_cap < 20.0 * M {
            MarketCapBand::M5To20
        } else if market_cap < 50.0 * M {
            MarketCapBand::M20To50
        } else if market_cap < 100.0 * M {
            MarketCapBand::M50To100
        } else if market_cap < 250.0 * M {
            MarketCapBand::M100To250
        } else {
            MarketCapBand::M250Plus
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MarketCapBand::Sub1M => "<1M",
            MarketCapBand::M1To5 => "1-5M",
            MarketCapBand::M5To20 => "5-20M",
            MarketCapBand::M20To50 => "20-50M",
            MarketCapBand::M50To100 => "50-100M",
            MarketCapBand::M100To250 => "100-250M",
            MarketCapBand::M250Plus => ">=250M",
        }
    }
}

/// Display formatting with B/M/K suffixes; absent caps render as "N/A".
pub fn format_market_cap(market_cap: Option<f64>) -> String {
    let Some(mc) = coerce_finite(market_cap).filter(|m| *m > 0.0) else {
        return "N/A".to_string();
    };
    if mc >= 1e9 {
        format!("{:.2}B", mc / 1e9)
    } else if mc >= 1e6 {
        format!("{:.2}M", mc / 1e6)
    } else if mc >= 1e3 {
        format!("{:.2}K", mc / 1e3)
    } else {
        format!("{}", mc)
    }
}

/// Micro-cap safety check from the risk audit card.
pub fn is_penny_stock(market_cap: Option<f64>) -> bool {
    matches!(market_cap, Some(mc) if mc < 5_000_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_unit_marker() {
        assert!(is_minor_unit("ABC.L"));
        assert!(is_minor_unit("abc.l"));
        assert!(!is_minor_unit("AAPL"));
        assert!(!is_minor_unit(""));
    }

    #[test]
    fn resolve_price_prefers_pence_for_lse() {
        let q = PriceQuote::new(Some(999.0), Some(150.0));
        assert_eq!(resolve_price("ABC.L", q), Some(1.5));
        // Non-LSE ticker ignores the pence sibling
        assert_eq!(resolve_price("AAPL", q), Some(999.0));
    }

    #[test]
    fn resolve_price_falls_back_when_pence_absent_or_bad() {
        assert_eq!(
            resolve_price("ABC.L", PriceQuote::new(Some(2.5), None)),
            Some(2.5)
        );
        assert_eq!(
            resolve_price("ABC.L", PriceQuote::new(Some(2.5), Some(f64::NAN))),
            Some(2.5)
        );
        assert_eq!(resolve_price("ABC.L", PriceQuote::default()), None);
        assert_eq!(
            resolve_price("ABC.L", PriceQuote::new(Some(f64::INFINITY), None)),
            None
        );
    }

    #[test]
    fn market_cap_candidate_order() {
        let info = TickerInfo {
            market_cap_pence: Some(500_000_000.0),
            market_cap: Some(1.0),
            ..Default::default()
        };
        let meta = TickerMetadata {
            company_info: Some(CompanyInfo {
                current_market_cap_pence: Some(300_000_000.0),
                current_market_cap: Some(2.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        // Lookup pence wins
        assert_eq!(resolve_market_cap(Some(&meta), Some(&info)), Some(5_000_000.0));

        // Then company pence
        let info_no_pence = TickerInfo {
            market_cap: Some(1.0),
            ..Default::default()
        };
        assert_eq!(
            resolve_market_cap(Some(&meta), Some(&info_no_pence)),
            Some(3_000_000.0)
        );

        // Then company GBP
        let meta_gbp_only = TickerMetadata {
            company_info: Some(CompanyInfo {
                current_market_cap: Some(12_000_000.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            resolve_market_cap(Some(&meta_gbp_only), Some(&info_no_pence)),
            Some(12_000_000.0)
        );

        // Then lookup GBP, else absent
        assert_eq!(resolve_market_cap(None, Some(&info_no_pence)), Some(1.0));
        assert_eq!(resolve_market_cap(None, None), None);
    }

    #[test]
    fn pnl_basic_and_guards() {
        assert_eq!(compute_pnl(Some(100.0), Some(110.0)), Some(10.0));
        assert_eq!(compute_pnl(Some(50.0), Some(50.0)), Some(0.0));
        // Missing current price means flat
        assert_eq!(compute_pnl(Some(9.0), None), Some(0.0));
        // Zero / missing / non-finite entry is unavailable, not Infinity
        assert_eq!(compute_pnl(Some(0.0), Some(10.0)), None);
        assert_eq!(compute_pnl(None, Some(10.0)), None);
        assert_eq!(compute_pnl(Some(f64::NAN), Some(10.0)), None);
    }

    #[test]
    fn band_lower_bounds_are_inclusive() {
        assert_eq!(MarketCapBand::classify(999_999.0), MarketCapBand::Sub1M);
        assert_eq!(MarketCapBand::classify(1_000_000.0), MarketCapBand::M1To5);
        assert_eq!(MarketCapBand::classify(5_000_000.0), MarketCapBand::M5To20);
        assert_eq!(MarketCapBand::classify(12_000_000.0), MarketCapBand::M5To20);
        assert_eq!(MarketCapBand::classify(20_000_000.0), MarketCapBand::M20To50);
        assert_eq!(MarketCapBand::classify(100_000_000.0), MarketCapBand::M100To250);
        assert_eq!(MarketCapBand::classify(250_000_000.0), MarketCapBand::M250Plus);
    }

    #[test]
    fn market_cap_formatting() {
        assert_eq!(format_market_cap(Some(2_500_000_000.0)), "2.50B");
        assert_eq!(format_market_cap(Some(12_000_000.0)), "12.00M");
        assert_eq!(format_market_cap(Some(45_000.0)), "45.00K");
        assert_eq!(format_market_cap(None), "N/A");
        assert_eq!(format_market_cap(Some(f64::NAN)), "N/A");
    }

    #[test]
    fn penny_stock_threshold() {
        assert!(is_penny_stock(Some(4_999_999.0)));
        assert!(!is_penny_stock(Some(5_000_000.0)));
        assert!(!is_penny_stock(None));
    }
}
