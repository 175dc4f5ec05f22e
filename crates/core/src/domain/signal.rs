use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Sell,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
        }
    }
}

/// A classified engulfing reversal over one (previous, current) candle pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub kind: SignalKind,
    pub signal_date: NaiveDate,
    pub current_open: f64,
    pub current_close: f64,
    pub prev_open: f64,
    pub prev_close: f64,
    pub strength_pct: f64,
    pub reason: String,
}
