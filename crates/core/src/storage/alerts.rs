use crate::domain::Signal;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One persisted signal, insert-only.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredAlert {
    pub id: Uuid,
    pub symbol: String,
    pub kind: String,
    pub signal_date: NaiveDate,
    pub current_open: f64,
    pub current_close: f64,
    pub prev_open: f64,
    pub prev_close: f64,
    pub strength_pct: f64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

const ALERT_COLUMNS: &str =
    "id, symbol, kind, signal_date, current_open, current_close, prev_open, prev_close, strength_pct, reason, created_at";

pub(crate) async fn insert_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    signal: &Signal,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO alerts (id, symbol, kind, signal_date, current_open, current_close, prev_open, prev_close, strength_pct, reason) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(id)
    .bind(&signal.symbol)
    .bind(signal.kind.as_str())
    .bind(signal.signal_date)
    .bind(signal.current_open)
    .bind(signal.current_close)
    .bind(signal.prev_open)
    .bind(signal.prev_close)
    .bind(signal.strength_pct)
    .bind(&signal.reason)
    .execute(&mut **tx)
    .await
    .context("insert alerts failed")?;

    Ok(id)
}

/// Paged listing with optional kind / symbol filters, newest first.
pub async fn list_alerts(
    pool: &sqlx::PgPool,
    kind: Option<&str>,
    symbol: Option<&str>,
    page: i64,
    per_page: i64,
) -> anyhow::Result<(Vec<StoredAlert>, i64)> {
    anyhow::ensure!(page >= 1, "page must be >= 1 (got {page})");
    anyhow::ensure!(
        (1..=200).contains(&per_page),
        "per_page must be 1..=200 (got {per_page})"
    );

    let mut qb = sqlx::QueryBuilder::new(format!(
        "SELECT {ALERT_COLUMNS} FROM alerts WHERE TRUE"
    ));
    if let Some(kind) = kind {
        qb.push(" AND kind = ").push_bind(kind.to_string());
    }
    if let Some(symbol) = symbol {
        qb.push(" AND symbol = ").push_bind(symbol.to_string());
    }
    qb.push(" ORDER BY created_at DESC, id ASC LIMIT ")
        .push_bind(per_page)
        .push(" OFFSET ")
        .push_bind((page - 1) * per_page);

    let rows: Vec<StoredAlert> = qb
        .build_query_as()
        .persistent(false)
        .fetch_all(pool)
        .await
        .context("list alerts failed")?;

    let mut count_qb = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM alerts WHERE TRUE");
    if let Some(kind) = kind {
        count_qb.push(" AND kind = ").push_bind(kind.to_string());
    }
    if let Some(symbol) = symbol {
        count_qb.push(" AND symbol = ").push_bind(symbol.to_string());
    }
    let (total,): (i64,) = count_qb
        .build_query_as()
        .persistent(false)
        .fetch_one(pool)
        .await
        .context("count alerts failed")?;

    Ok((rows, total))
}

pub async fn recent_alerts(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<Vec<StoredAlert>> {
    let rows: Vec<StoredAlert> = sqlx::query_as(&format!(
        "SELECT {ALERT_COLUMNS} FROM alerts ORDER BY created_at DESC, id ASC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("recent alerts failed")?;

    Ok(rows)
}

/// Strongest persisted alerts of one kind, for the dashboard.
pub async fn top_alerts_by_strength(
    pool: &sqlx::PgPool,
    kind: &str,
    limit: i64,
) -> anyhow::Result<Vec<StoredAlert>> {
    let rows: Vec<StoredAlert> = sqlx::query_as(&format!(
        "SELECT {ALERT_COLUMNS} FROM alerts WHERE kind = $1 \
         ORDER BY strength_pct DESC, symbol ASC LIMIT $2"
    ))
    .bind(kind)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("top alerts failed")?;

    Ok(rows)
}

pub async fn count_alerts(pool: &sqlx::PgPool, kind: Option<&str>) -> anyhow::Result<i64> {
    let (count,): (i64,) = match kind {
        Some(kind) => sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE kind = $1")
            .bind(kind)
            .fetch_one(pool)
            .await
            .context("count alerts failed")?,
        None => sqlx::query_as("SELECT COUNT(*) FROM alerts")
            .fetch_one(pool)
            .await
            .context("count alerts failed")?,
    };
    Ok(count)
}
