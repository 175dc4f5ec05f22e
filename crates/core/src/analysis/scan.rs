use crate::analysis::StockAnalyzer;
use crate::domain::{ScanFailure, ScanReport, SignalKind, StockAnalysis};
use chrono::{NaiveDate, Utc};
use std::cmp::Ordering;
use std::time::Instant;

impl StockAnalyzer {
    /// Run one sequential batch scan over `symbols`. A failing symbol is
    /// recorded and the scan moves on; it never aborts the batch or affects
    /// other symbols. The report is finalized only after every symbol has
    /// been attempted, so `succeeded + failed == total_requested` holds.
    pub async fn scan(&self, symbols: &[String], today: NaiveDate) -> ScanReport {
        let started_at = Utc::now();
        let t0 = Instant::now();

        tracing::info!(
            total = symbols.len(),
            source = self.source_name(),
            "starting batch scan"
        );

        let mut analyses: Vec<StockAnalysis> = Vec::new();
        let mut errors: Vec<ScanFailure> = Vec::new();

        for symbol in symbols {
            let analysis = self.analyze(symbol, today).await;
            match &analysis.error {
                Some(detail) => errors.push(ScanFailure {
                    symbol: symbol.clone(),
                    detail: detail.clone(),
                }),
                None => {
                    tracing::debug!(
                        %symbol,
                        signal = analysis.latest_signal_kind().map(|k| k.as_str()),
                        "symbol analyzed"
                    );
                    analyses.push(analysis);
                }
            }
        }

        let mut buy_signals: Vec<StockAnalysis> = analyses
            .iter()
            .filter(|a| a.latest_signal_kind() == Some(SignalKind::Buy))
            .cloned()
            .collect();
        let mut sell_signals: Vec<StockAnalysis> = analyses
            .iter()
            .filter(|a| a.latest_signal_kind() == Some(SignalKind::Sell))
            .cloned()
            .collect();

        sort_by_strength(&mut buy_signals);
        sort_by_strength(&mut sell_signals);

        let report = ScanReport {
            started_at,
            total_requested: symbols.len(),
            succeeded: analyses.len(),
            failed: errors.len(),
            buy_signals,
            sell_signals,
            analyses,
            errors,
            duration_ms: t0.elapsed().as_millis() as u64,
        };

        let summary = report.summary();
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            buys = summary.buy_count,
            sells = summary.sell_count,
            duration_ms = report.duration_ms,
            "batch scan finished"
        );

        report
    }
}

/// Highest-conviction first; ties broken by symbol for a deterministic order
/// regardless of how the analyses were produced.
fn sort_by_strength(list: &mut [StockAnalysis]) {
    list.sort_by(|a, b| {
        let sa = a
            .latest_signal
            .as_ref()
            .map(|s| s.strength_pct)
            .unwrap_or(0.0);
        let sb = b
            .latest_signal
            .as_ref()
            .map(|s| s.strength_pct)
            .unwrap_or(0.0);
        sb.partial_cmp(&sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}
