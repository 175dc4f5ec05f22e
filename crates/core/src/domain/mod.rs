pub mod candle;
pub mod report;
pub mod signal;

pub use candle::{CandleColor, EnrichedCandle, OhlcvRow, PrevCandle};
pub use report::{ScanFailure, ScanReport, ScanSummary, StockAnalysis, Trend, WindowMode};
pub use signal::{Signal, SignalKind};
