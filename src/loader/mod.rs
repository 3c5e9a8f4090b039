//! signals.csv reader. Header-based, flexible: a row missing its ticker,
//! date or color is dropped rather than failing the whole load.

pub mod clean;

use crate::models::{RawSignalRow, Signal};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use self::clean::row_to_signal;

/// Column names as the generator writes them.
const COLUMNS: [&str; 9] = [
    "Ticker",
    "Date",
    "Signal_Type",
    "Signal_Color",
    "Price",
    "AI_Technical_Score",
    "Drawdown_Pct",
    "Exchange",
    "Market",
];

struct ColumnIndex {
    idx: [Option<usize>; 9],
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut idx = [None; 9];
        for (i, name) in COLUMNS.iter().enumerate() {
            idx[i] = headers.iter().position(|h| h.trim() == *name);
        }
        Self { idx }
    }

    fn get(&self, record: &csv::StringRecord, col: usize) -> Option<String> {
        self.idx[col]
            .and_then(|i| record.get(i))
            .map(|s| s.to_string())
    }
}

/// Parse signals from any reader (file or fetched body).
pub fn read_signals<R: Read>(rdr: R) -> Result<Vec<Signal>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(rdr);

    let headers = reader.headers().context("signals.csv has no header row")?.clone();
    let cols = ColumnIndex::from_headers(&headers);

    let mut signals = Vec::new();
    let mut dropped = 0usize;

    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {}: {}", i + 1, e);
                dropped += 1;
                continue;
            }
        };

        let raw = RawSignalRow {
            ticker: cols.get(&record, 0),
            date: cols.get(&record, 1),
            signal_type: cols.get(&record, 2),
            color: cols.get(&record, 3),
            price: cols.get(&record, 4),
            ai_score: cols.get(&record, 5),
            drawdown_pct: cols.get(&record, 6),
            exchange: cols.get(&record, 7),
            market: cols.get(&record, 8),
        };

        match row_to_signal(&raw) {
            Some(signal) => signals.push(signal),
            None => dropped += 1,
        }
    }

    debug!("{} signals parsed, {} rows dropped", signals.len(), dropped);
    Ok(signals)
}

pub fn load_signals_csv(path: &Path) -> Result<Vec<Signal>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Could not open {:?}", path))?;
    let signals = read_signals(file)?;
    info!("{:?}: {} signals loaded", path, signals.len());
    Ok(signals)
}

pub fn parse_signals_csv(body: &str) -> Result<Vec<Signal>> {
    read_signals(body.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SignalColor;

    const CSV: &str = "\
Ticker,Date,Signal_Type,Signal_Color,Price,AI_Technical_Score,Drawdown_Pct,Exchange,Market
ABC.L,2024-01-10,ULTRA CRASH,RED,10.00,8.5,-62.1,LSE,AIM
ABC.L,2024-01-05,CRASH ZONE,YELLOW,9.00,6.1,-40.0,LSE,AIM
,2024-01-04,CRASH ZONE,YELLOW,5.00,5.0,-30.0,,
XYZ.L,2024-02-01,ENHANCED EXTREME CRASH,PURPLE,1.25,9.2,-71.3,AQUIS,MAIN
";

    #[test]
    fn parses_header_csv_and_drops_tickerless_rows() {
        let signals = parse_signals_csv(CSV).unwrap();
        assert_eq!(signals.len(), 3);
        assert_eq!(signals[0].ticker, "ABC.L");
        assert_eq!(signals[0].color, SignalColor::Red);
        assert_eq!(signals[2].ticker, "XYZ.L");
        assert!(signals[2].is_enhanced());
        assert_eq!(signals[2].exchange.as_deref(), Some("AQUIS"));
    }

    #[test]
    fn column_order_does_not_matter() {
        let csv = "\
Date,Ticker,Signal_Color,Signal_Type
2024-03-01,DEF.L,ORANGE,EXTREME CRASH
";
        let signals = parse_signals_csv(csv).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].ticker, "DEF.L");
        assert_eq!(signals[0].color, SignalColor::Orange);
        assert_eq!(signals[0].price, None);
    }
}
