use crate::analysis::{detect, detect_series, enrich};
use crate::domain::{StockAnalysis, Trend};
use crate::error::ScanStageError;
use crate::market::{self, MarketDataSource};
use crate::time::month_window::resolve_comparison_pair;
use anyhow::Result;
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

/// How far back to fetch. Two years of monthly candles gives the signal
/// history view enough context without stressing the source.
const FETCH_WINDOW_DAYS: i64 = 365 * 2;

/// Runs the fetch -> enrich -> detect pipeline for one symbol at a time.
pub struct StockAnalyzer {
    source: Arc<dyn MarketDataSource>,
}

impl StockAnalyzer {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    /// Analyze one symbol. Never fails: every pipeline error (unavailable
    /// data, too little history, malformed rows) is converted into an
    /// analysis record with `error` set, so a batch caller is never aborted.
    pub async fn analyze(&self, symbol: &str, today: NaiveDate) -> StockAnalysis {
        match self.try_analyze(symbol, today).await {
            Ok(analysis) => analysis,
            Err(err) => {
                let stage = err
                    .downcast_ref::<ScanStageError>()
                    .map(|e| e.stage())
                    .unwrap_or("fetch");
                tracing::warn!(symbol, stage, error = %err, "symbol analysis failed");
                StockAnalysis::failed(symbol, format!("{err:#}"))
            }
        }
    }

    async fn try_analyze(&self, symbol: &str, today: NaiveDate) -> Result<StockAnalysis> {
        let start = today - Duration::days(FETCH_WINDOW_DAYS);
        let rows = self.source.fetch_monthly(symbol, start, today).await?;
        market::validate_rows(symbol, &rows)?;

        let candles = enrich(&rows);
        let (prev_idx, curr_idx, window) = resolve_comparison_pair(&candles, today)
            .ok_or_else(|| {
                anyhow::Error::new(ScanStageError::InsufficientHistory {
                    symbol: symbol.to_string(),
                    rows: candles.len(),
                })
            })?;

        let latest_signal = detect(symbol, &candles[prev_idx], &candles[curr_idx]);
        let signal_history = detect_series(symbol, &candles);

        // resolve_comparison_pair guarantees at least two candles.
        let last = candles[candles.len() - 1];

        Ok(StockAnalysis {
            symbol: symbol.to_string(),
            latest_price: Some(last.close()),
            trend: Some(Trend::from_color(last.color)),
            price_change_pct: Some(last.price_change_pct),
            latest_signal,
            window: Some(window),
            signal_history,
            candles,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OhlcvRow, SignalKind, WindowMode};
    use crate::market::data_unavailable;
    use std::collections::HashMap;

    /// Scripted source for pipeline tests: fixed rows per symbol, or a
    /// simulated fetch failure for symbols that are not scripted.
    struct ScriptedSource {
        series: HashMap<String, Vec<OhlcvRow>>,
    }

    #[async_trait::async_trait]
    impl MarketDataSource for ScriptedSource {
        fn source_name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_monthly(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<OhlcvRow>> {
            self.series
                .get(symbol)
                .cloned()
                .ok_or_else(|| data_unavailable(symbol, "connection refused"))
        }
    }

    fn row(y: i32, m: u32, open: f64, close: f64) -> OhlcvRow {
        OhlcvRow {
            date: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
            open,
            high: open.max(close) + 2.0,
            low: open.min(close) - 2.0,
            close,
            volume: 500_000,
        }
    }

    fn today() -> NaiveDate {
        // Complete months: December 2025 and January 2026.
        NaiveDate::from_ymd_opt(2026, 2, 15).unwrap()
    }

    fn analyzer_with(series: HashMap<String, Vec<OhlcvRow>>) -> StockAnalyzer {
        StockAnalyzer::new(Arc::new(ScriptedSource { series }))
    }

    #[tokio::test]
    async fn buy_signal_on_the_complete_month_pair() {
        let series = HashMap::from([(
            "RELIANCE".to_string(),
            vec![
                row(2025, 10, 480.0, 505.0),
                row(2025, 11, 505.0, 500.0),
                row(2025, 12, 500.0, 450.0),
                row(2026, 1, 460.0, 520.0),
            ],
        )]);

        let analysis = analyzer_with(series).analyze("RELIANCE", today()).await;

        assert!(analysis.is_ok());
        assert_eq!(analysis.window, Some(WindowMode::CompleteMonths));
        assert_eq!(analysis.latest_price, Some(520.0));
        assert_eq!(analysis.trend, Some(Trend::Up));

        let signal = analysis.latest_signal.unwrap();
        assert_eq!(signal.kind, SignalKind::Buy);
        assert!((signal.strength_pct - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn fetch_failure_becomes_error_record() {
        let analysis = analyzer_with(HashMap::new()).analyze("UNKNOWN", today()).await;

        assert!(!analysis.is_ok());
        assert!(analysis.error.as_deref().unwrap().contains("UNKNOWN"));
        assert!(analysis.latest_signal.is_none());
        assert!(analysis.trend.is_none());
        assert!(analysis.candles.is_empty());
    }

    #[tokio::test]
    async fn single_row_is_insufficient_history() {
        let series = HashMap::from([(
            "NEWLIST".to_string(),
            vec![row(2026, 1, 100.0, 120.0)],
        )]);

        let analysis = analyzer_with(series).analyze("NEWLIST", today()).await;

        assert!(!analysis.is_ok());
        assert!(analysis
            .error
            .as_deref()
            .unwrap()
            .contains("insufficient history"));
    }

    #[tokio::test]
    async fn malformed_rows_are_rejected() {
        let mut bad = row(2026, 1, 100.0, 120.0);
        bad.close = -1.0;
        let series = HashMap::from([(
            "BROKEN".to_string(),
            vec![row(2025, 12, 100.0, 110.0), bad],
        )]);

        let analysis = analyzer_with(series).analyze("BROKEN", today()).await;

        assert!(!analysis.is_ok());
        assert!(analysis
            .error
            .as_deref()
            .unwrap()
            .contains("malformed market data"));
    }

    #[tokio::test]
    async fn missing_month_uses_tagged_fallback() {
        // No January 2026 row, so the pair degrades to the last two rows.
        let series = HashMap::from([(
            "SPARSE".to_string(),
            vec![row(2025, 11, 400.0, 450.0), row(2025, 12, 440.0, 380.0)],
        )]);

        let analysis = analyzer_with(series).analyze("SPARSE", today()).await;

        assert!(analysis.is_ok());
        assert_eq!(analysis.window, Some(WindowMode::LastTwoRows));
        let signal = analysis.latest_signal.unwrap();
        assert_eq!(signal.kind, SignalKind::Sell);
        assert!((signal.strength_pct - 5.0).abs() < 1e-9);
    }
}
