use crate::domain::OhlcvRow;
use crate::market::{data_unavailable, MarketDataSource};
use crate::time::month_window::{month_start, next_month_start, prev_month_start};
use anyhow::Result;
use chrono::NaiveDate;

/// Deterministic offline source: the same symbol always yields the same
/// synthetic series. Used for development and tests; no network access.
#[derive(Debug, Clone, Default)]
pub struct MockMarketData;

impl MockMarketData {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl MarketDataSource for MockMarketData {
    fn source_name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_monthly(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvRow>> {
        let rows = generate_series(symbol, start, end);
        if rows.is_empty() {
            return Err(data_unavailable(symbol, "empty synthetic range"));
        }
        Ok(rows)
    }
}

fn seed_for(symbol: &str) -> u64 {
    // FNV-1a over the uppercased symbol; zero is remapped because xorshift
    // cannot leave a zero state.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in symbol.trim().to_ascii_uppercase().bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    if hash == 0 {
        0x9e37_79b9_7f4a_7c15
    } else {
        hash
    }
}

struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform in [0, 1).
    fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One monthly candle per complete month in [start, end): a random walk with
/// monthly moves in roughly +/-8% and high/low brackets around the body.
fn generate_series(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<OhlcvRow> {
    let mut rng = XorShift64::new(seed_for(symbol));
    let mut price = 100.0 + rng.next_unit() * 2900.0;

    let last_month = prev_month_start(end);
    let mut month = month_start(start);
    let mut out = Vec::new();

    while month <= last_month {
        let change = (rng.next_unit() - 0.5) * 0.16;
        let open = price;
        let close = open * (1.0 + change);
        let high = open.max(close) * (1.0 + rng.next_unit() * 0.02);
        let low = open.min(close) * (1.0 - rng.next_unit() * 0.02);
        let volume = 1_000_000 + rng.next_u64() % 49_000_000;

        out.push(OhlcvRow {
            date: month,
            open: round2(open),
            high: round2(high),
            low: round2(low),
            close: round2(close),
            volume,
        });

        price = close;
        month = next_month_start(month);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::month_window::last_two_complete_months;
    use chrono::Datelike;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn same_symbol_same_series() {
        let source = MockMarketData::new();
        let start = ymd(2024, 2, 15);
        let end = ymd(2026, 2, 15);

        let a = source.fetch_monthly("RELIANCE", start, end).await.unwrap();
        let b = source.fetch_monthly("RELIANCE", start, end).await.unwrap();
        assert_eq!(a, b);

        let other = source.fetch_monthly("TCS", start, end).await.unwrap();
        assert_ne!(a, other);
    }

    #[tokio::test]
    async fn rows_are_ascending_positive_and_monthly() {
        let source = MockMarketData::new();
        let rows = source
            .fetch_monthly("HDFCBANK", ymd(2024, 2, 15), ymd(2026, 2, 15))
            .await
            .unwrap();

        assert!(!rows.is_empty());
        for row in &rows {
            assert_eq!(row.date.day(), 1);
            assert!(row.open > 0.0 && row.close > 0.0);
            assert!(row.high >= row.open.max(row.close));
            assert!(row.low <= row.open.min(row.close));
        }
        for pair in rows.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }

    #[tokio::test]
    async fn covers_the_two_most_recent_complete_months() {
        let today = ymd(2026, 2, 15);
        let (prev_month, curr_month) = last_two_complete_months(today);

        let source = MockMarketData::new();
        let rows = source
            .fetch_monthly("INFY", ymd(2024, 2, 15), today)
            .await
            .unwrap();

        assert!(rows.iter().any(|r| r.date == prev_month));
        assert!(rows.iter().any(|r| r.date == curr_month));
        // The incomplete current month is never generated.
        assert!(rows.iter().all(|r| r.date <= curr_month));
    }

    #[tokio::test]
    async fn empty_range_is_data_unavailable() {
        let source = MockMarketData::new();
        let err = source
            .fetch_monthly("RELIANCE", ymd(2026, 2, 10), ymd(2026, 2, 15))
            .await
            .unwrap_err();
        let stage = err
            .downcast_ref::<crate::error::ScanStageError>()
            .unwrap();
        assert_eq!(stage.stage(), "data_unavailable");
    }
}
