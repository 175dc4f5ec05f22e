pub mod mock;
pub mod yahoo;

use crate::config::Settings;
use crate::domain::OhlcvRow;
use crate::error::ScanStageError;
use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;

/// Capability interface over a monthly OHLCV source. Implementations map the
/// bare symbol to their own ticker convention; the rest of the pipeline only
/// ever sees bare symbols.
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Date-ascending monthly rows for `symbol` in [start, end]. Gaps are
    /// acceptable; out-of-order or duplicate dates are not. Fails with a
    /// `DataUnavailable` diagnostic when the source has no usable rows.
    async fn fetch_monthly(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvRow>>;
}

/// The only place the mock/live switch is read.
pub fn source_from_settings(settings: &Settings) -> Result<Arc<dyn MarketDataSource>> {
    if settings.use_mock_data {
        Ok(Arc::new(mock::MockMarketData::new()))
    } else {
        Ok(Arc::new(yahoo::YahooChartClient::from_settings(settings)?))
    }
}

pub(crate) fn data_unavailable(symbol: &str, detail: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(ScanStageError::DataUnavailable {
        symbol: symbol.to_string(),
        detail: detail.into(),
    })
}

fn malformed(symbol: &str, detail: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(ScanStageError::MalformedRow {
        symbol: symbol.to_string(),
        detail: detail.into(),
    })
}

/// Enforce the OHLCV invariants on a fetched series before it enters the
/// pipeline: positive prices and strictly ascending, duplicate-free dates.
pub fn validate_rows(symbol: &str, rows: &[OhlcvRow]) -> Result<()> {
    for row in rows {
        if row.open <= 0.0 || row.high <= 0.0 || row.low <= 0.0 || row.close <= 0.0 {
            return Err(malformed(
                symbol,
                format!("non-positive price on {}", row.date),
            ));
        }
    }

    for pair in rows.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(malformed(
                symbol,
                format!("rows out of order: {} then {}", pair[0].date, pair[1].date),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, open: f64) -> OhlcvRow {
        OhlcvRow {
            date: NaiveDate::from_ymd_opt(2025, 12, day).unwrap(),
            open,
            high: open + 10.0,
            low: open - 10.0,
            close: open + 5.0,
            volume: 1_000,
        }
    }

    #[test]
    fn accepts_ordered_positive_rows() {
        assert!(validate_rows("RELIANCE", &[row(1, 100.0), row(2, 105.0)]).is_ok());
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut bad = row(1, 100.0);
        bad.close = 0.0;
        let err = validate_rows("RELIANCE", &[bad]).unwrap_err();
        let stage = err.downcast_ref::<ScanStageError>().unwrap();
        assert_eq!(stage.stage(), "malformed_row");
    }

    #[test]
    fn rejects_duplicate_and_out_of_order_dates() {
        let err = validate_rows("TCS", &[row(2, 100.0), row(1, 105.0)]).unwrap_err();
        assert!(err.downcast_ref::<ScanStageError>().is_some());

        let err = validate_rows("TCS", &[row(1, 100.0), row(1, 105.0)]).unwrap_err();
        assert!(err.downcast_ref::<ScanStageError>().is_some());
    }
}
