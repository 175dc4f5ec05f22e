use crate::domain::candle::{CandleColor, EnrichedCandle};
use crate::domain::signal::{Signal, SignalKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn from_color(color: CandleColor) -> Self {
        match color {
            CandleColor::Green => Trend::Up,
            CandleColor::Red => Trend::Down,
            CandleColor::Doji => Trend::Flat,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        }
    }
}

/// How the latest comparison pair was chosen. `LastTwoRows` marks the
/// documented fallback used when either complete month is missing, so
/// callers can see degraded precision instead of having it hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    CompleteMonths,
    LastTwoRows,
}

/// Per-symbol output of one scan. Built fresh each run, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAnalysis {
    pub symbol: String,
    pub latest_price: Option<f64>,
    pub trend: Option<Trend>,
    pub price_change_pct: Option<f64>,
    pub latest_signal: Option<Signal>,
    pub window: Option<WindowMode>,
    pub signal_history: Vec<Signal>,
    pub candles: Vec<EnrichedCandle>,
    pub error: Option<String>,
}

impl StockAnalysis {
    pub fn failed(symbol: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            latest_price: None,
            trend: None,
            price_change_pct: None,
            latest_signal: None,
            window: None,
            signal_history: Vec::new(),
            candles: Vec::new(),
            error: Some(detail.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn latest_signal_kind(&self) -> Option<SignalKind> {
        self.latest_signal.as_ref().map(|s| s.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub symbol: String,
    pub detail: String,
}

/// Aggregate over one batch scan. Finalized only after every requested
/// symbol has been attempted; `succeeded + failed == total_requested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub total_requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful analyses whose latest signal is BUY, strongest first.
    pub buy_signals: Vec<StockAnalysis>,
    /// Successful analyses whose latest signal is SELL, strongest first.
    pub sell_signals: Vec<StockAnalysis>,
    /// Every successful analysis, in requested order.
    pub analyses: Vec<StockAnalysis>,
    pub errors: Vec<ScanFailure>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub bullish_count: usize,
    pub bearish_count: usize,
}

impl ScanReport {
    pub fn summary(&self) -> ScanSummary {
        let bullish_count = self
            .analyses
            .iter()
            .filter(|a| a.trend == Some(Trend::Up))
            .count();
        let bearish_count = self
            .analyses
            .iter()
            .filter(|a| a.trend == Some(Trend::Down))
            .count();

        ScanSummary {
            total_requested: self.total_requested,
            succeeded: self.succeeded,
            failed: self.failed,
            buy_count: self.buy_signals.len(),
            sell_count: self.sell_signals.len(),
            bullish_count,
            bearish_count,
        }
    }
}
