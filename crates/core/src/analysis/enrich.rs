use crate::domain::{CandleColor, EnrichedCandle, OhlcvRow, PrevCandle};

/// Derive per-candle attributes for a date-ordered OHLCV series.
///
/// Pure and length-preserving. The first element carries no `prev` fields;
/// element i (i >= 1) copies open/close/color from row i-1.
pub fn enrich(rows: &[OhlcvRow]) -> Vec<EnrichedCandle> {
    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let color = CandleColor::classify(row.open, row.close);
        let price_change = row.close - row.open;
        let price_change_pct = price_change / row.open * 100.0;

        let prev = if i == 0 {
            None
        } else {
            let p = &rows[i - 1];
            Some(PrevCandle {
                open: p.open,
                close: p.close,
                color: CandleColor::classify(p.open, p.close),
            })
        };

        out.push(EnrichedCandle {
            row: *row,
            color,
            price_change,
            price_change_pct,
            prev,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(month: u32, open: f64, close: f64) -> OhlcvRow {
        OhlcvRow {
            date: NaiveDate::from_ymd_opt(2025, month, 1).unwrap(),
            open,
            high: open.max(close) + 5.0,
            low: open.min(close) - 5.0,
            close,
            volume: 10_000,
        }
    }

    #[test]
    fn preserves_length_and_first_has_no_prev() {
        let rows = vec![row(1, 100.0, 110.0), row(2, 110.0, 105.0), row(3, 105.0, 105.0)];
        let candles = enrich(&rows);

        assert_eq!(candles.len(), rows.len());
        assert!(candles[0].prev.is_none());
        assert!(candles[1].prev.is_some());
    }

    #[test]
    fn prev_fields_copy_the_preceding_row() {
        let rows = vec![row(1, 100.0, 90.0), row(2, 92.0, 99.0)];
        let candles = enrich(&rows);

        let prev = candles[1].prev.unwrap();
        assert_eq!(prev.open, 100.0);
        assert_eq!(prev.close, 90.0);
        assert_eq!(prev.color, CandleColor::Red);
        assert_eq!(candles[1].color, CandleColor::Green);
    }

    #[test]
    fn doji_is_neither_green_nor_red() {
        let candles = enrich(&[row(1, 100.0, 100.0)]);
        assert_eq!(candles[0].color, CandleColor::Doji);
        assert!(!candles[0].is_green());
        assert!(!candles[0].is_red());
        assert_eq!(candles[0].price_change, 0.0);
        assert_eq!(candles[0].price_change_pct, 0.0);
    }

    #[test]
    fn computes_change_and_percentage() {
        let candles = enrich(&[row(1, 200.0, 230.0)]);
        assert_eq!(candles[0].price_change, 30.0);
        assert!((candles[0].price_change_pct - 15.0).abs() < 1e-9);
    }

    #[test]
    fn input_is_not_mutated() {
        let rows = vec![row(1, 100.0, 110.0), row(2, 110.0, 120.0)];
        let before = rows.clone();
        let _ = enrich(&rows);
        assert_eq!(rows, before);
    }
}
