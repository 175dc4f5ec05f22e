use crate::config::Settings;
use crate::domain::OhlcvRow;
use crate::market::{data_unavailable, MarketDataSource};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const NSE_SUFFIX: &str = ".NS";
const USER_AGENT: &str = "candlewatch/0.1";

/// Live source backed by the Yahoo Finance v8 chart endpoint. The NSE
/// ticker convention (base symbol + ".NS") is applied here and nowhere else.
#[derive(Debug, Clone)]
pub struct YahooChartClient {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl YahooChartClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .market_data_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("MARKET_DATA_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            retries,
        })
    }

    fn ticker(symbol: &str) -> String {
        format!("{}{NSE_SUFFIX}", symbol.trim().to_ascii_uppercase())
    }

    fn url(&self, symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            Self::ticker(symbol)
        )
    }

    async fn fetch_once(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvRow>> {
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .context("invalid start date")?
            .and_utc()
            .timestamp();
        let period2 = end
            .and_hms_opt(23, 59, 59)
            .context("invalid end date")?
            .and_utc()
            .timestamp();

        let res = self
            .http
            .get(self.url(symbol))
            .query(&[
                ("interval", "1mo".to_string()),
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
            ])
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(data_unavailable(symbol, format!("HTTP 404: {text}")));
        }
        if !status.is_success() {
            anyhow::bail!("market data HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<ChartResponse>(&text)
            .with_context(|| format!("market data response is not valid chart JSON: {text}"))?;

        rows_from_chart(symbol, parsed)
    }
}

#[async_trait::async_trait]
impl MarketDataSource for YahooChartClient {
    fn source_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_monthly(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvRow>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(symbol, start, end).await {
                Ok(rows) => return Ok(rows),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(
                        symbol,
                        attempt,
                        ?backoff,
                        error = %err,
                        "market data fetch failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

/// Yahoo pads these arrays with nulls for periods without trades.
#[derive(Debug, Deserialize)]
struct QuoteBlock {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

fn rows_from_chart(symbol: &str, response: ChartResponse) -> Result<Vec<OhlcvRow>> {
    if let Some(error) = response.chart.error {
        if !error.is_null() {
            return Err(data_unavailable(symbol, format!("chart error: {error}")));
        }
    }

    let result = response
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| data_unavailable(symbol, "empty chart result"))?;

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| data_unavailable(symbol, "missing quote block"))?;

    let mut rows = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let fields = (
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
            quote.volume.get(i).copied().flatten(),
        );
        // Skip null-padded periods rather than fabricating prices.
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = fields else {
            continue;
        };

        let date = DateTime::from_timestamp(*ts, 0)
            .with_context(|| format!("invalid timestamp {ts} for {symbol}"))?
            .date_naive();

        rows.push(OhlcvRow {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if rows.is_empty() {
        return Err(data_unavailable(symbol, "no usable rows in chart result"));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanStageError;
    use serde_json::json;

    #[test]
    fn maps_symbol_to_nse_ticker() {
        assert_eq!(YahooChartClient::ticker("reliance"), "RELIANCE.NS");
        assert_eq!(YahooChartClient::ticker(" TCS "), "TCS.NS");
    }

    #[test]
    fn parses_chart_payload_and_skips_null_padding() {
        // 2025-11-01 and 2025-12-01 plus one null-padded period.
        let v = json!({
            "chart": {
                "result": [{
                    "timestamp": [1761955200i64, 1764547200i64, 1767225600i64],
                    "indicators": {
                        "quote": [{
                            "open":   [500.0, 460.0, null],
                            "high":   [505.0, 525.0, null],
                            "low":    [445.0, 455.0, null],
                            "close":  [450.0, 520.0, null],
                            "volume": [1000000u64, 2000000u64, null]
                        }]
                    }
                }],
                "error": null
            }
        });

        let parsed: ChartResponse = serde_json::from_value(v).unwrap();
        let rows = rows_from_chart("RELIANCE", parsed).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].open, 500.0);
        assert_eq!(rows[1].close, 520.0);
        assert!(rows[0].date < rows[1].date);
    }

    #[test]
    fn chart_error_is_data_unavailable() {
        let v = json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found"}
            }
        });

        let parsed: ChartResponse = serde_json::from_value(v).unwrap();
        let err = rows_from_chart("BOGUS", parsed).unwrap_err();
        let stage = err.downcast_ref::<ScanStageError>().unwrap();
        assert_eq!(stage.stage(), "data_unavailable");
    }

    #[test]
    fn all_null_rows_are_data_unavailable() {
        let v = json!({
            "chart": {
                "result": [{
                    "timestamp": [1764547200i64],
                    "indicators": {
                        "quote": [{
                            "open": [null], "high": [null], "low": [null],
                            "close": [null], "volume": [null]
                        }]
                    }
                }],
                "error": null
            }
        });

        let parsed: ChartResponse = serde_json::from_value(v).unwrap();
        assert!(rows_from_chart("DELISTED", parsed).is_err());
    }
}
