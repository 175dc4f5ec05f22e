pub mod analyzer;
pub mod detect;
pub mod enrich;
pub mod scan;

pub use analyzer::StockAnalyzer;
pub use detect::{detect, detect_series};
pub use enrich::enrich;
