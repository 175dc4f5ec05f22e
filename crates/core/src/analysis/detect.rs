use crate::domain::{EnrichedCandle, Signal, SignalKind};

/// Classify one (previous, current) candle pair.
///
/// BUY: current green, previous red, current close above previous open.
/// SELL: current red, previous green, current close below previous open.
/// Strength is the breakout move relative to the previous open. The two
/// branches are mutually exclusive because green/red are.
pub fn detect(
    symbol: &str,
    previous: &EnrichedCandle,
    current: &EnrichedCandle,
) -> Option<Signal> {
    if current.is_green() && previous.is_red() && current.close() > previous.open() {
        let strength_pct = (current.close() - previous.open()) / previous.open() * 100.0;
        return Some(Signal {
            symbol: symbol.to_string(),
            kind: SignalKind::Buy,
            signal_date: current.date(),
            current_open: current.open(),
            current_close: current.close(),
            prev_open: previous.open(),
            prev_close: previous.close(),
            strength_pct,
            reason: format!(
                "Green candle closed at ₹{:.2}, above previous red candle's open of ₹{:.2}",
                current.close(),
                previous.open()
            ),
        });
    }

    if current.is_red() && previous.is_green() && current.close() < previous.open() {
        let strength_pct = (previous.open() - current.close()) / previous.open() * 100.0;
        return Some(Signal {
            symbol: symbol.to_string(),
            kind: SignalKind::Sell,
            signal_date: current.date(),
            current_open: current.open(),
            current_close: current.close(),
            prev_open: previous.open(),
            prev_close: previous.close(),
            strength_pct,
            reason: format!(
                "Red candle closed at ₹{:.2}, below previous green candle's open of ₹{:.2}",
                current.close(),
                previous.open()
            ),
        });
    }

    None
}

/// Run the detector over every consecutive pair of a series. Pairs are
/// evaluated independently; signals from non-adjacent pairs never combine.
pub fn detect_series(symbol: &str, candles: &[EnrichedCandle]) -> Vec<Signal> {
    candles
        .windows(2)
        .filter_map(|pair| detect(symbol, &pair[0], &pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::enrich;
    use crate::domain::OhlcvRow;
    use chrono::NaiveDate;

    fn row(month: u32, open: f64, close: f64) -> OhlcvRow {
        OhlcvRow {
            date: NaiveDate::from_ymd_opt(2025, month, 1).unwrap(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 10_000,
        }
    }

    fn pair(prev: (f64, f64), curr: (f64, f64)) -> Vec<EnrichedCandle> {
        enrich(&[row(11, prev.0, prev.1), row(12, curr.0, curr.1)])
    }

    #[test]
    fn buy_on_green_engulfing_red() {
        // Previous red 500 -> 450, current green 460 -> 520 closes above 500.
        let candles = pair((500.0, 450.0), (460.0, 520.0));
        let signal = detect("RELIANCE", &candles[0], &candles[1]).unwrap();

        assert_eq!(signal.kind, SignalKind::Buy);
        assert!((signal.strength_pct - 4.0).abs() < 1e-9);
        assert_eq!(signal.prev_open, 500.0);
        assert_eq!(signal.current_close, 520.0);
        assert_eq!(signal.signal_date, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert!(signal.reason.contains("above previous red candle's open"));
    }

    #[test]
    fn sell_on_red_engulfing_green() {
        // Previous green 400 -> 450, current red 440 -> 380 closes below 400.
        let candles = pair((400.0, 450.0), (440.0, 380.0));
        let signal = detect("TCS", &candles[0], &candles[1]).unwrap();

        assert_eq!(signal.kind, SignalKind::Sell);
        assert!((signal.strength_pct - 5.0).abs() < 1e-9);
        assert!(signal.reason.contains("below previous green candle's open"));
    }

    #[test]
    fn no_signal_without_breakout() {
        // Current green but closes at 480, not above the previous open of 500.
        let candles = pair((500.0, 450.0), (460.0, 480.0));
        assert!(detect("INFY", &candles[0], &candles[1]).is_none());
    }

    #[test]
    fn no_signal_when_colors_do_not_reverse() {
        let green_then_green = pair((400.0, 450.0), (450.0, 500.0));
        assert!(detect("SBIN", &green_then_green[0], &green_then_green[1]).is_none());

        let red_then_red = pair((500.0, 450.0), (450.0, 400.0));
        assert!(detect("SBIN", &red_then_red[0], &red_then_red[1]).is_none());
    }

    #[test]
    fn doji_is_never_a_signal_side() {
        let doji_previous = pair((500.0, 500.0), (460.0, 520.0));
        assert!(detect("ITC", &doji_previous[0], &doji_previous[1]).is_none());

        let doji_current = pair((500.0, 450.0), (520.0, 520.0));
        assert!(detect("ITC", &doji_current[0], &doji_current[1]).is_none());
    }

    #[test]
    fn detect_is_pure() {
        let candles = pair((500.0, 450.0), (460.0, 520.0));
        let first = detect("LT", &candles[0], &candles[1]);
        let second = detect("LT", &candles[0], &candles[1]);
        assert_eq!(first, second);
    }

    #[test]
    fn series_walks_every_adjacent_pair_independently() {
        // red, green breakout (BUY), green, red breakdown (SELL).
        let rows = vec![
            row(1, 500.0, 450.0),
            row(2, 460.0, 520.0),
            row(3, 520.0, 560.0),
            row(4, 550.0, 510.0),
        ];
        let candles = enrich(&rows);
        let signals = detect_series("MARUTI", &candles);

        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].kind, SignalKind::Buy);
        assert_eq!(signals[0].signal_date, rows[1].date);
        assert_eq!(signals[1].kind, SignalKind::Sell);
        assert_eq!(signals[1].signal_date, rows[3].date);
    }
}
