use crate::domain::StockAnalysis;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// A tracked stock's latest persisted state, one row per symbol.
#[derive(Debug, Clone, Serialize)]
pub struct StoredStock {
    pub symbol: String,
    pub latest_price: Option<f64>,
    pub trend: Option<String>,
    pub price_change_pct: Option<f64>,
    pub last_signal_type: Option<String>,
    pub last_signal_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

type StockRow = (
    String,
    Option<f64>,
    Option<String>,
    Option<f64>,
    Option<String>,
    Option<NaiveDate>,
    DateTime<Utc>,
);

fn stock_from_row(row: StockRow) -> StoredStock {
    let (symbol, latest_price, trend, price_change_pct, last_signal_type, last_signal_date, updated_at) =
        row;
    StoredStock {
        symbol,
        latest_price,
        trend,
        price_change_pct,
        last_signal_type,
        last_signal_date,
        updated_at,
    }
}

pub(crate) async fn upsert_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    analysis: &StockAnalysis,
) -> anyhow::Result<()> {
    let trend = analysis.trend.map(|t| t.as_str());
    let signal = analysis.latest_signal.as_ref();

    sqlx::query(
        "INSERT INTO stocks (symbol, latest_price, trend, price_change_pct, last_signal_type, last_signal_date, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, now()) \
         ON CONFLICT (symbol) DO UPDATE \
           SET latest_price = EXCLUDED.latest_price, \
               trend = EXCLUDED.trend, \
               price_change_pct = EXCLUDED.price_change_pct, \
               last_signal_type = COALESCE(EXCLUDED.last_signal_type, stocks.last_signal_type), \
               last_signal_date = COALESCE(EXCLUDED.last_signal_date, stocks.last_signal_date), \
               updated_at = EXCLUDED.updated_at",
    )
    .bind(&analysis.symbol)
    .bind(analysis.latest_price)
    .bind(trend)
    .bind(analysis.price_change_pct)
    .bind(signal.map(|s| s.kind.as_str()))
    .bind(signal.map(|s| s.signal_date))
    .execute(&mut **tx)
    .await
    .context("upsert stocks failed")?;

    Ok(())
}

/// Paged listing with optional trend / signal-type filters, most recently
/// updated first.
pub async fn list_stocks(
    pool: &sqlx::PgPool,
    trend: Option<&str>,
    signal: Option<&str>,
    page: i64,
    per_page: i64,
) -> anyhow::Result<(Vec<StoredStock>, i64)> {
    anyhow::ensure!(page >= 1, "page must be >= 1 (got {page})");
    anyhow::ensure!(
        (1..=200).contains(&per_page),
        "per_page must be 1..=200 (got {per_page})"
    );

    let mut qb = sqlx::QueryBuilder::new(
        "SELECT symbol, latest_price, trend, price_change_pct, last_signal_type, last_signal_date, updated_at \
         FROM stocks WHERE TRUE",
    );
    if let Some(trend) = trend {
        qb.push(" AND trend = ").push_bind(trend.to_string());
    }
    if let Some(signal) = signal {
        qb.push(" AND last_signal_type = ")
            .push_bind(signal.to_string());
    }
    qb.push(" ORDER BY updated_at DESC, symbol ASC LIMIT ")
        .push_bind(per_page)
        .push(" OFFSET ")
        .push_bind((page - 1) * per_page);

    let rows: Vec<StockRow> = qb
        .build_query_as()
        .persistent(false)
        .fetch_all(pool)
        .await
        .context("list stocks failed")?;

    let mut count_qb = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM stocks WHERE TRUE");
    if let Some(trend) = trend {
        count_qb.push(" AND trend = ").push_bind(trend.to_string());
    }
    if let Some(signal) = signal {
        count_qb
            .push(" AND last_signal_type = ")
            .push_bind(signal.to_string());
    }
    let (total,): (i64,) = count_qb
        .build_query_as()
        .persistent(false)
        .fetch_one(pool)
        .await
        .context("count stocks failed")?;

    Ok((rows.into_iter().map(stock_from_row).collect(), total))
}

pub async fn count_stocks(pool: &sqlx::PgPool) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stocks")
        .fetch_one(pool)
        .await
        .context("count stocks failed")?;
    Ok(count)
}
