use crate::time::month_window::month_start;
use anyhow::Context;
use chrono::{Datelike, NaiveDate};

// Advisory locks are scoped to the Postgres session. Used as a best-effort
// guard against concurrent batch scans for the same calendar month.
const LOCK_NAMESPACE: i64 = 0x4341_4E44_4C45; // "CANDLE" as hex-ish namespace.

fn lock_key_for_month(today: NaiveDate) -> i64 {
    LOCK_NAMESPACE ^ (month_start(today).num_days_from_ce() as i64)
}

pub async fn try_acquire_scan_lock(
    pool: &sqlx::PgPool,
    today: NaiveDate,
) -> anyhow::Result<bool> {
    let key = lock_key_for_month(today);
    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;
    Ok(acquired.0)
}

pub async fn release_scan_lock(pool: &sqlx::PgPool, today: NaiveDate) -> anyhow::Result<()> {
    let key = lock_key_for_month(today);
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .persistent(false)
        .bind(key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to release advisory lock (key={key})"))?;
    Ok(())
}
