use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One monthly OHLCV bar as returned by a market data source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleColor {
    Green,
    Red,
    /// open == close. A doji is never a signal side.
    Doji,
}

impl CandleColor {
    pub fn classify(open: f64, close: f64) -> Self {
        if close > open {
            CandleColor::Green
        } else if close < open {
            CandleColor::Red
        } else {
            CandleColor::Doji
        }
    }

    pub fn is_green(self) -> bool {
        matches!(self, CandleColor::Green)
    }

    pub fn is_red(self) -> bool {
        matches!(self, CandleColor::Red)
    }
}

/// Open/close/color carried forward from the immediately preceding row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrevCandle {
    pub open: f64,
    pub close: f64,
    pub color: CandleColor,
}

/// An OHLCV row plus the per-candle attributes derived from it.
/// Recomputed on every run; never persisted separately from its row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCandle {
    #[serde(flatten)]
    pub row: OhlcvRow,
    pub color: CandleColor,
    pub price_change: f64,
    pub price_change_pct: f64,
    pub prev: Option<PrevCandle>,
}

impl EnrichedCandle {
    pub fn date(&self) -> NaiveDate {
        self.row.date
    }

    pub fn open(&self) -> f64 {
        self.row.open
    }

    pub fn close(&self) -> f64 {
        self.row.close
    }

    pub fn is_green(&self) -> bool {
        self.color.is_green()
    }

    pub fn is_red(&self) -> bool {
        self.color.is_red()
    }
}
