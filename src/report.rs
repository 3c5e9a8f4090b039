//! Terminal rendering of the dashboard views. Pure presentation: every
//! number printed here is resolved by `store`/`derive`, never recomputed.

use crate::apex::ApexView;
use crate::config::ViewMode;
use crate::derive::{self, format_market_cap, MarketCapBand};
use crate::models::{ChartData, DashboardStats, Signal, SignalColor, TickerMetadata};
use crate::store::{SignalStore, TickerGroup};
use crate::utils::{fmt_num1, fmt_number, fmt_price, fmt_signed_pct};

const RULE: &str = "────────────────────────────────────────────────────────────────────────────";

fn heading(title: &str) {
    println!("{}", RULE);
    println!("  {}", title);
    println!("{}", RULE);
}

// ── Stats card ────────────────────────────────────────────────────────────────

pub fn print_stats(stats: &DashboardStats, unique_tickers: usize) {
    heading("CrashDash — Scan Stats");
    println!(
        "  Total signals : {}",
        stats
            .total_signals
            .map(|n| fmt_number(n as i64))
            .unwrap_or_else(|| "—".into())
    );
    println!("  Tickers       : {}", tracked_universe(unique_tickers));
    println!(
        "  Latest scan   : {}",
        stats.latest_scan_date.as_deref().unwrap_or("—")
    );
    if let Some(generated) = stats.generated.as_deref() {
        println!("  Generated     : {}", generated);
    }
    if !stats.signal_colors.is_empty() {
        let mut colors: Vec<_> = stats.signal_colors.iter().collect();
        colors.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        println!("  By color      :");
        for (color, count) in colors {
            println!("    {:<8} {}", color, fmt_number(*count as i64));
        }
    }
    println!("{}", RULE);
}

// ── Signal tables ─────────────────────────────────────────────────────────────

/// Main table: capped at `max_rows`, newest rows first (caller sorts).
pub fn print_signals(store: &SignalStore, signals: &[Signal], mode: ViewMode, max_rows: usize) {
    let shown = signals.len().min(max_rows);
    match mode {
        ViewMode::Full => print_full_rows(store, &signals[..shown]),
        ViewMode::Compact => print_compact_rows(store, &signals[..shown]),
    }
    if signals.len() > shown {
        println!(
            "  … {} more (showing first {})",
            fmt_number((signals.len() - shown) as i64),
            shown
        );
    }
}

/// Clamped page arithmetic: a zero page size or out-of-range page number
/// degrades to the nearest valid page instead of panicking.
fn page_bounds(len: usize, page: usize, page_size: usize) -> (usize, usize, usize, usize) {
    let page_size = page_size.max(1);
    let pages = len.div_ceil(page_size).max(1);
    let page = page.clamp(1, pages);
    let start = ((page - 1) * page_size).min(len);
    let end = (start + page_size).min(len);
    (page, pages, start, end)
}

/// Full-history listing: every row, one page of `page_size` at a time.
pub fn print_signal_page(
    store: &SignalStore,
    signals: &[Signal],
    mode: ViewMode,
    page: usize,
    page_size: usize,
) {
    let (page, pages, start, end) = page_bounds(signals.len(), page, page_size);

    match mode {
        ViewMode::Full => print_full_rows(store, &signals[start..end]),
        ViewMode::Compact => print_compact_rows(store, &signals[start..end]),
    }
    println!(
        "  Page {}/{} — {} signals total",
        page,
        pages,
        fmt_number(signals.len() as i64)
    );
}

/// Badge text the full table shows: the base color implied by the type, with
/// a flash for ENHANCED combos (the stored color stays authoritative for
/// sorting and the compact view).
fn badge(s: &Signal) -> String {
    let base = SignalColor::base_from_type(&s.signal_type);
    if s.is_enhanced() {
        format!("{}⚡", base.as_str())
    } else {
        base.as_str().to_string()
    }
}

fn print_full_rows(store: &SignalStore, rows: &[Signal]) {
    println!(
        "  {:<10} {:<24} {:<10} {:<22} {:<8} {:>9} {:>5} {:>8} {:>8} {:>8}",
        "Ticker", "Company", "Date", "Type", "Badge", "Price", "AI", "DD%", "P&L", "MCap"
    );
    for s in rows {
        let name = store.company_name(&s.ticker).unwrap_or("—");
        println!(
            "  {:<10} {:<24} {:<10} {:<22} {:<8} {:>9} {:>5} {:>8} {:>8} {:>8}",
            s.ticker,
            truncate(name, 24),
            s.date,
            truncate(&s.signal_type, 22),
            badge(s),
            fmt_price(s.price),
            fmt_num1(s.ai_score),
            fmt_num1(s.drawdown_pct),
            fmt_signed_pct(store.current_pnl(s)),
            format_market_cap(store.market_cap(&s.ticker)),
        );
    }
}

fn print_compact_rows(store: &SignalStore, rows: &[Signal]) {
    println!(
        "  {:<10} {:<10} {:<7} {:>9} {:>8}",
        "Ticker", "Date", "Color", "Price", "P&L"
    );
    for s in rows {
        println!(
            "  {:<10} {:<10} {:<7} {:>9} {:>8}",
            s.ticker,
            s.date,
            s.color.as_str(),
            fmt_price(s.price),
            fmt_signed_pct(store.current_pnl(s)),
        );
    }
}

// ── Grouped ticker table ──────────────────────────────────────────────────────

pub fn print_groups(store: &SignalStore, groups: &[TickerGroup]) {
    println!(
        "  {:<10} {:<24} {:>4} {:<10} {:<22} {:<7} {:>8} {:>8}",
        "Ticker", "Company", "N", "Latest", "Type", "Color", "P&L", "Rally"
    );
    for g in groups {
        let name = store.company_name(&g.ticker).unwrap_or("—");
        println!(
            "  {:<10} {:<24} {:>4} {:<10} {:<22} {:<7} {:>8} {:>8}",
            g.ticker,
            truncate(name, 24),
            g.count,
            g.latest.date,
            truncate(&g.latest.signal_type, 22),
            g.latest.color.as_str(),
            fmt_signed_pct(store.current_pnl(&g.latest)),
            fmt_signed_pct(store.best_rally(&g.ticker)),
        );
    }
    println!("  {} tickers", fmt_number(groups.len() as i64));
}

// ── Ticker detail card ────────────────────────────────────────────────────────

pub fn print_ticker_detail(store: &SignalStore, ticker: &str, meta: &TickerMetadata) {
    let name = store
        .company_name(ticker)
        .or_else(|| meta.company_info.as_ref().and_then(|c| c.name.as_deref()))
        .unwrap_or(ticker);
    heading(&format!("{} — {}", ticker, name));

    if let Some(info) = meta.company_info.as_ref() {
        println!(
            "  Sector   : {} / {}",
            info.sector.as_deref().unwrap_or("—"),
            info.industry.as_deref().unwrap_or("—")
        );
    }
    println!(
        "  Listed   : {}-{}",
        meta.exchange.as_deref().unwrap_or("LSE"),
        meta.market.as_deref().unwrap_or("AIM")
    );

    let mcap = store.market_cap(ticker);
    let mut cap_line = format!("  Mkt cap  : {}", format_market_cap(mcap));
    if let Some(mc) = mcap {
        cap_line.push_str(&format!(" ({})", MarketCapBand::classify(mc).label()));
    }
    if derive::is_penny_stock(mcap) {
        cap_line.push_str("  [PENNY STOCK]");
    }
    println!("{}", cap_line);

    if let Some(b) = meta.basics.as_ref() {
        println!(
            "  Price    : {}  (ATH {} on {}, ATL {} on {})",
            fmt_price(derive::resolve_price(ticker, b.current_price_quote())),
            fmt_price(derive::resolve_price(ticker, b.ath_quote())),
            b.ath_date.as_deref().unwrap_or("—"),
            fmt_price(derive::resolve_price(ticker, b.atl_quote())),
            b.atl_date.as_deref().unwrap_or("—"),
        );
        if let Some(dd) = b.drawdown_from_ath_pct {
            println!("  From ATH : {:.1}%", dd);
        }
    }

    if let Some(latest) = meta.latest_signal.as_ref() {
        println!(
            "  Latest   : {} @ {}  RSI {}  P&L {}",
            latest.date.as_deref().unwrap_or("—"),
            fmt_price(derive::resolve_price(ticker, latest.price_quote())),
            fmt_num1(latest.rsi),
            fmt_signed_pct(latest.current_pnl_pct),
        );
    }

    if let Some(best) = meta.best_historical_signal.as_ref() {
        println!(
            "  Best run : {} → {} ({}), {} days from {}",
            fmt_price(derive::resolve_price(ticker, best.entry_price_quote())),
            fmt_price(derive::resolve_price(ticker, best.peak_price_quote())),
            fmt_signed_pct(best.rally_pct),
            best.days_to_peak.unwrap_or(0),
            best.signal_date.as_deref().unwrap_or("—"),
        );
    }

    if let Some(stats) = meta.stats.as_ref() {
        println!(
            "  History  : {} signals, win rate {}, avg rally {}, best {}",
            stats.total_signals.unwrap_or(0),
            fmt_signed_pct(stats.win_rate_pct),
            fmt_signed_pct(stats.avg_rally_pct),
            fmt_signed_pct(stats.best_rally_pct),
        );
    }

    if let Some(risk) = meta.split_risk.as_ref() {
        if risk.split_detected.unwrap_or(false) {
            println!(
                "  ⚠ Split  : {} ({}) — {}",
                risk.split_type.as_deref().unwrap_or("detected"),
                risk.risk_level.as_deref().unwrap_or("UNKNOWN"),
                risk.warning
                    .as_deref()
                    .or(risk.recommendation.as_deref())
                    .unwrap_or("see history"),
            );
        }
    }
    if let Some(flags) = meta.risk_flags.as_ref() {
        for flag in flags {
            println!("  ⚠ Risk   : {}", flag);
        }
    }
    if let Some(splits) = meta.splits.as_ref() {
        for split in splits {
            println!(
                "  Split    : {}  {}",
                split.date.as_deref().unwrap_or("—"),
                split.ratio.as_deref().unwrap_or("—"),
            );
        }
    }

    if let Some(history) = meta.all_historical_signals.as_ref() {
        if !history.is_empty() {
            println!("  Signals  :");
            for h in history {
                println!(
                    "    {}  {:<22} {:<7} entry {}  rally {}  {}",
                    h.date.as_deref().unwrap_or("—"),
                    truncate(h.signal_type.as_deref().unwrap_or("—"), 22),
                    h.color.as_deref().unwrap_or("—"),
                    fmt_price(h.entry_price),
                    fmt_signed_pct(h.rally_pct),
                    h.outcome.as_deref().unwrap_or(""),
                );
            }
        }
    }
    println!("{}", RULE);
}

// ── APEX report ───────────────────────────────────────────────────────────────

pub fn print_apex(ticker: &str, view: &ApexView) {
    heading(&format!("{} — APEX {:.0}/100 ({})", ticker, view.composite_score, view.composite_label));

    println!("  Components:");
    for c in &view.components {
        println!(
            "    {:<12} {:>5.1}  weight {:.2}  pctile {:>5.1}  σ {:.2}",
            c.name, c.score, c.weight, c.percentile, c.std
        );
    }

    let t = &view.trust;
    println!("  Trust {:.1} — CI [{:.1}, {:.1}], n={}, σe {:.2}", t.score, t.ci_low, t.ci_high, t.sample_size, t.std_error);
    for src in &t.coverage {
        println!(
            "    {:<8} {:<9} coverage {:>5.1}%  reliability {}",
            src.source,
            src.freshness,
            src.coverage,
            reliability_cell(src.reliability)
        );
    }

    let s = &view.setup_detail;
    println!(
        "  Setup: AI {:.1}, drawdown {:.1}%, rel-vol {:.2}, rallies {}, best {:.1}%",
        s.ai_technical_score, s.drawdown_pct, s.relative_volume, s.rally_count, s.best_historical_rally
    );
    for p in &s.penalties {
        println!("    penalty: {}", p);
    }

    let p = &view.panic_detail;
    println!(
        "  Panic: destruction {:.1}, vol-death {:.1}, silence {:.1}, news {:.1}  {}",
        p.price_destruction, p.volume_death, p.social_silence, p.news_sentiment, p.crash_signal
    );

    let c = &view.compression_detail;
    println!(
        "  Compression [{}]: {:.2} sig/wk, RSI extremes {}, escalations {}, pop {:.0}%",
        c.congestion_band, c.signals_per_week, c.rsi_extreme_count, c.escalation_events, c.pop_potential
    );
    if !c.intensification_pattern.is_empty() {
        println!(
            "    intensification {:.1} ({})",
            c.intensification_score, c.intensification_pattern
        );
    }
    println!("{}", RULE);
}

// ── Chart summary ─────────────────────────────────────────────────────────────

pub fn print_chart_summary(ticker: &str, chart: &ChartData) {
    heading(&format!("{} — Chart", ticker));
    if chart.candles.is_empty() {
        println!("  No price history.");
    } else {
        let first = &chart.candles[0];
        let last = &chart.candles[chart.candles.len() - 1];
        println!(
            "  {} bars, {} → {}",
            fmt_number(chart.candles.len() as i64),
            first.date,
            last.date
        );
        println!(
            "  Close {} → {}",
            fmt_price(Some(first.close)),
            fmt_price(Some(last.close))
        );
    }
    if !chart.markers.is_empty() {
        println!("  {} signal markers:", chart.markers.len());
        for m in &chart.markers {
            println!(
                "    {}  {:<7} @ {}  {}",
                m.date.as_deref().unwrap_or("—"),
                m.color.as_deref().unwrap_or("—"),
                fmt_price(m.price),
                m.comment.as_deref().unwrap_or(""),
            );
        }
    }
    println!("{}", RULE);
}

/// Tracked-universe figure: "600+" until the loaded count actually exceeds
/// the advertised floor, then the exact number.
fn tracked_universe(unique_tickers: usize) -> String {
    if unique_tickers > 600 {
        fmt_number(unique_tickers as i64)
    } else {
        "600+".to_string()
    }
}

/// Reliability is carried as a [0,1] fraction; render it as a percentage.
fn reliability_cell(reliability: f64) -> String {
    format!("{:>5.1}%", reliability * 100.0)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_tolerates_zero_page_size_and_bad_pages() {
        // Zero page size (possible via CRASHDASH__DISPLAY__PAGE_SIZE=0) must
        // not divide by zero.
        assert_eq!(page_bounds(0, 1, 0), (1, 1, 0, 0));
        assert_eq!(page_bounds(5, 1, 0), (1, 5, 0, 1));

        // Page 0 and past-the-end pages clamp into range.
        assert_eq!(page_bounds(10, 0, 4), (1, 3, 0, 4));
        assert_eq!(page_bounds(10, 99, 4), (3, 3, 8, 10));

        // Ordinary paging.
        assert_eq!(page_bounds(10, 2, 4), (2, 3, 4, 8));
        assert_eq!(page_bounds(0, 1, 50), (1, 1, 0, 0));
    }

    #[test]
    fn zero_page_size_prints_without_panicking() {
        let store = SignalStore::default();
        print_signal_page(&store, &[], ViewMode::Compact, 1, 0);
    }

    #[test]
    fn reliability_renders_fraction_as_percent() {
        assert_eq!(reliability_cell(0.95), " 95.0%");
        assert_eq!(reliability_cell(0.6), " 60.0%");
        assert_eq!(reliability_cell(0.0), "  0.0%");
    }

    #[test]
    fn tracked_universe_floors_at_600() {
        assert_eq!(tracked_universe(0), "600+");
        assert_eq!(tracked_universe(600), "600+");
        assert_eq!(tracked_universe(601), "601");
        assert_eq!(tracked_universe(1_234), "1,234");
    }

    #[test]
    fn badge_uses_type_base_color_and_enhanced_flash() {
        let mut s = Signal {
            ticker: "ABC.L".into(),
            date: "2024-01-10".parse().unwrap(),
            signal_type: "ENHANCED ULTRA CRASH".into(),
            color: SignalColor::Purple,
            price: None,
            ai_score: None,
            drawdown_pct: None,
            exchange: None,
            market: None,
        };
        assert_eq!(badge(&s), "RED⚡");

        s.signal_type = "DEEP VALUE".into();
        assert_eq!(badge(&s), "GREEN");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly_ten", 11), "exactly_ten");
        let cut = truncate("ABCDEFGHIJKLMNOP", 8);
        assert_eq!(cut.chars().count(), 8);
        assert!(cut.ends_with('…'));
    }
}
