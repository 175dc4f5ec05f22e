use crate::domain::{EnrichedCandle, WindowMode};
use chrono::{Datelike, NaiveDate};

pub fn month_start(date: NaiveDate) -> NaiveDate {
    // Day 1 always exists, so the fallback never fires.
    date.with_day(1).unwrap_or(date)
}

pub fn prev_month_start(date: NaiveDate) -> NaiveDate {
    let first = month_start(date);
    let (year, month) = if first.month() == 1 {
        (first.year() - 1, 12)
    } else {
        (first.year(), first.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first)
}

pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    let first = month_start(date);
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first)
}

/// First days of the two most recent complete calendar months relative to
/// `today`. For a `today` of 2026-01-29 this is (2025-11-01, 2025-12-01).
pub fn last_two_complete_months(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let current = prev_month_start(today);
    let previous = prev_month_start(current);
    (previous, current)
}

fn in_month(date: NaiveDate, month: NaiveDate) -> bool {
    date.year() == month.year() && date.month() == month.month()
}

/// Pick the (previous, current) comparison pair out of a date-ordered series.
///
/// Prefers the candles dated in the two most recent complete calendar months.
/// When either month is missing from the series, falls back to the last two
/// available rows and tags the result `WindowMode::LastTwoRows` so callers
/// see the degraded window. `None` when fewer than two candles exist.
pub fn resolve_comparison_pair(
    candles: &[EnrichedCandle],
    today: NaiveDate,
) -> Option<(usize, usize, WindowMode)> {
    if candles.len() < 2 {
        return None;
    }

    let (prev_month, curr_month) = last_two_complete_months(today);
    let prev_idx = candles.iter().position(|c| in_month(c.date(), prev_month));
    let curr_idx = candles.iter().position(|c| in_month(c.date(), curr_month));

    if let (Some(p), Some(c)) = (prev_idx, curr_idx) {
        return Some((p, c, WindowMode::CompleteMonths));
    }

    tracing::warn!(
        %prev_month,
        %curr_month,
        "complete-month window unavailable; falling back to last two rows"
    );
    Some((candles.len() - 2, candles.len() - 1, WindowMode::LastTwoRows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::enrich;
    use crate::domain::OhlcvRow;

    fn row(date: NaiveDate) -> OhlcvRow {
        OhlcvRow {
            date,
            open: 100.0,
            high: 110.0,
            low: 95.0,
            close: 105.0,
            volume: 1_000,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn two_complete_months_mid_month() {
        let (prev, curr) = last_two_complete_months(ymd(2026, 1, 29));
        assert_eq!(prev, ymd(2025, 11, 1));
        assert_eq!(curr, ymd(2025, 12, 1));
    }

    #[test]
    fn two_complete_months_across_year_boundary() {
        let (prev, curr) = last_two_complete_months(ymd(2026, 2, 10));
        assert_eq!(prev, ymd(2025, 12, 1));
        assert_eq!(curr, ymd(2026, 1, 1));
    }

    #[test]
    fn month_arithmetic_wraps() {
        assert_eq!(prev_month_start(ymd(2026, 1, 15)), ymd(2025, 12, 1));
        assert_eq!(next_month_start(ymd(2025, 12, 31)), ymd(2026, 1, 1));
    }

    #[test]
    fn prefers_complete_month_candles() {
        let candles = enrich(&[
            row(ymd(2025, 10, 1)),
            row(ymd(2025, 11, 1)),
            row(ymd(2025, 12, 1)),
        ]);
        let (p, c, mode) = resolve_comparison_pair(&candles, ymd(2026, 1, 29)).unwrap();
        assert_eq!(p, 1);
        assert_eq!(c, 2);
        assert_eq!(mode, WindowMode::CompleteMonths);
    }

    #[test]
    fn falls_back_to_last_two_rows_when_month_missing() {
        // December 2025 is absent, so the complete-month window cannot form.
        let candles = enrich(&[
            row(ymd(2025, 9, 1)),
            row(ymd(2025, 10, 1)),
            row(ymd(2025, 11, 1)),
        ]);
        let (p, c, mode) = resolve_comparison_pair(&candles, ymd(2026, 1, 29)).unwrap();
        assert_eq!(p, 1);
        assert_eq!(c, 2);
        assert_eq!(mode, WindowMode::LastTwoRows);
    }

    #[test]
    fn single_candle_has_no_pair() {
        let candles = enrich(&[row(ymd(2025, 12, 1))]);
        assert!(resolve_comparison_pair(&candles, ymd(2026, 1, 29)).is_none());
    }
}
