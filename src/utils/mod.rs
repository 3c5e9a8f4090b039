use std::time::{Duration, Instant};
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

/// Format a large integer with thousands separators.
pub fn fmt_number(n: i64) -> String {
    let s = n.abs().to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    if n < 0 {
        result.push('-');
    }
    result.chars().rev().collect()
}

/// Signed percentage for P&L cells: "+12.3%", "-4.0%", "-" when unavailable.
pub fn fmt_signed_pct(v: Option<f64>) -> String {
    match v {
        Some(v) if v >= 0.0 => format!("+{:.1}%", v),
        Some(v) => format!("{:.1}%", v),
        None => "-".to_string(),
    }
}

/// Price cell with the feed's 4-decimal pence convention; "-" when absent.
pub fn fmt_price(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{:.4}", v),
        _ => "-".to_string(),
    }
}

/// Fixed-point cell with a dash placeholder.
pub fn fmt_num1(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{:.1}", v),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_number() {
        assert_eq!(fmt_number(1_234_567), "1,234,567");
        assert_eq!(fmt_number(0), "0");
        assert_eq!(fmt_number(-42_000), "-42,000");
        assert_eq!(fmt_number(999), "999");
    }

    #[test]
    fn test_fmt_signed_pct() {
        assert_eq!(fmt_signed_pct(Some(12.34)), "+12.3%");
        assert_eq!(fmt_signed_pct(Some(0.0)), "+0.0%");
        assert_eq!(fmt_signed_pct(Some(-4.0)), "-4.0%");
        assert_eq!(fmt_signed_pct(None), "-");
    }

    #[test]
    fn test_fmt_price() {
        assert_eq!(fmt_price(Some(1.5)), "1.5000");
        assert_eq!(fmt_price(Some(f64::NAN)), "-");
        assert_eq!(fmt_price(None), "-");
    }
}
