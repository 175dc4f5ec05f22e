use std::fmt;

/// Recoverable per-symbol failures in the scan pipeline. Carried inside
/// `anyhow::Error` so call sites keep `?`-style propagation; the analyzer
/// boundary downcasts to classify what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStageError {
    /// The source has no usable rows for the symbol/range (network failure,
    /// unknown or delisted symbol, empty result).
    DataUnavailable { symbol: String, detail: String },
    /// Fewer than 2 usable candles even after the window fallback.
    InsufficientHistory { symbol: String, rows: usize },
    /// A fetched row violates the OHLCV invariants.
    MalformedRow { symbol: String, detail: String },
}

impl ScanStageError {
    pub fn stage(&self) -> &'static str {
        match self {
            ScanStageError::DataUnavailable { .. } => "data_unavailable",
            ScanStageError::InsufficientHistory { .. } => "insufficient_history",
            ScanStageError::MalformedRow { .. } => "malformed_row",
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            ScanStageError::DataUnavailable { symbol, .. }
            | ScanStageError::InsufficientHistory { symbol, .. }
            | ScanStageError::MalformedRow { symbol, .. } => symbol,
        }
    }
}

impl fmt::Display for ScanStageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStageError::DataUnavailable { symbol, detail } => {
                write!(f, "no usable market data for {symbol}: {detail}")
            }
            ScanStageError::InsufficientHistory { symbol, rows } => {
                write!(
                    f,
                    "insufficient history for {symbol}: {rows} candle(s), need at least 2"
                )
            }
            ScanStageError::MalformedRow { symbol, detail } => {
                write!(f, "malformed market data for {symbol}: {detail}")
            }
        }
    }
}

impl std::error::Error for ScanStageError {}
