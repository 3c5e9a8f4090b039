use crate::models::{RawSignalRow, Signal, SignalColor};
use chrono::NaiveDate;
use tracing::warn;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse price: strip everything except digits, dot, minus.
/// "1,234.56" → 1234.56 | "610.00p" → 610.0
pub fn parse_price(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "N/A" || s == "-" || s == "—" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok().filter(|n: &f64| n.is_finite())
}

pub fn parse_pct(s: &str) -> Option<f64> {
    let s = s.trim().replace('%', "").replace(',', "");
    if s.is_empty() || s == "N/A" || s == "-" {
        return None;
    }
    s.parse().ok().filter(|n: &f64| n.is_finite())
}

/// Parse dates: ISO first (the generator emits ISO), then common fallbacks.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%b %d, %Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d %b %Y") {
        return Some(d);
    }

    None
}

pub fn normalise_ticker(s: &str) -> String {
    s.trim().to_uppercase()
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.and_then(|s| {
        let s = s.trim();
        if s.is_empty() { None } else { Some(s.to_string()) }
    })
}

// ── Raw row → Signal ──────────────────────────────────────────────────────────

/// Completeness check lives here: a row without ticker, date and color is
/// dropped, everything else degrades to None.
pub fn row_to_signal(row: &RawSignalRow) -> Option<Signal> {
    let ticker = non_empty(row.ticker.clone())?;

    let date_str = row.date.as_deref()?.trim();
    let date = parse_date(date_str)?;

    let color_str = row.color.as_deref()?;
    let Some(color) = SignalColor::parse(color_str) else {
        warn!("Unknown signal color {:?} for {} on {}", color_str, ticker, date);
        return None;
    };

    Some(Signal {
        ticker: normalise_ticker(&ticker),
        date,
        signal_type: row.signal_type.clone().unwrap_or_default().trim().to_string(),
        color,
        price: row.price.as_deref().and_then(parse_price),
        ai_score: row.ai_score.as_deref().and_then(parse_pct),
        drawdown_pct: row.drawdown_pct.as_deref().and_then(parse_pct),
        exchange: non_empty(row.exchange.clone()),
        market: non_empty(row.market.clone()),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ticker: &str, date: &str, color: &str) -> RawSignalRow {
        RawSignalRow {
            ticker: Some(ticker.into()),
            date: Some(date.into()),
            signal_type: Some("ULTRA CRASH".into()),
            color: Some(color.into()),
            price: Some("10.00".into()),
            ai_score: Some("8.5".into()),
            drawdown_pct: Some("-62.1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1,234.56"), Some(1234.56));
        assert_eq!(parse_price("610.00p"), Some(610.0));
        assert_eq!(parse_price("-"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("N/A"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expect = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(parse_date("2024-01-10"), Some(expect));
        assert_eq!(parse_date("10/01/2024"), Some(expect));
        assert_eq!(parse_date("Jan 10, 2024"), Some(expect));
        assert_eq!(parse_date("junk"), None);
    }

    #[test]
    fn complete_row_converts() {
        let s = row_to_signal(&raw("abc.l", "2024-01-10", "RED")).unwrap();
        assert_eq!(s.ticker, "ABC.L");
        assert_eq!(s.color, SignalColor::Red);
        assert_eq!(s.price, Some(10.0));
        assert_eq!(s.drawdown_pct, Some(-62.1));
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let mut r = raw("ABC.L", "2024-01-10", "RED");
        r.ticker = None;
        assert!(row_to_signal(&r).is_none());

        let mut r = raw("ABC.L", "2024-01-10", "RED");
        r.date = Some("not-a-date".into());
        assert!(row_to_signal(&r).is_none());

        let mut r = raw("ABC.L", "2024-01-10", "RED");
        r.color = Some("MAGENTA".into());
        assert!(row_to_signal(&r).is_none());
    }

    #[test]
    fn bad_numerics_degrade_to_none() {
        let mut r = raw("ABC.L", "2024-01-10", "YELLOW");
        r.price = Some("n/a".into());
        r.ai_score = None;
        let s = row_to_signal(&r).unwrap();
        assert_eq!(s.price, None);
        assert_eq!(s.ai_score, None);
    }
}
