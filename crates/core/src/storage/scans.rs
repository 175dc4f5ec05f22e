use crate::domain::ScanReport;
use crate::storage::{alerts, stocks};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One persisted batch scan outcome.
#[derive(Debug, Clone, Serialize)]
pub struct StoredScanRun {
    pub id: Uuid,
    pub scan_type: String,
    pub total_requested: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub buy_count: i32,
    pub sell_count: i32,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// Persist a whole scan in one transaction: the scan_runs row, a stocks
/// upsert per successful analysis, and an alerts row per latest signal.
/// A scan with zero successes still records its run.
pub async fn persist_scan_report(
    pool: &sqlx::PgPool,
    report: &ScanReport,
    scan_type: &str,
) -> anyhow::Result<Uuid> {
    let summary = report.summary();
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    let run_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO scan_runs (id, scan_type, total_requested, succeeded, failed, buy_count, sell_count, duration_ms, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(run_id)
    .bind(scan_type)
    .bind(summary.total_requested as i32)
    .bind(summary.succeeded as i32)
    .bind(summary.failed as i32)
    .bind(summary.buy_count as i32)
    .bind(summary.sell_count as i32)
    .bind(report.duration_ms as i64)
    .bind(report.started_at)
    .execute(&mut *tx)
    .await
    .context("insert scan_runs failed")?;

    for analysis in &report.analyses {
        stocks::upsert_in_tx(&mut tx, analysis).await?;
        if let Some(signal) = &analysis.latest_signal {
            alerts::insert_in_tx(&mut tx, signal).await?;
        }
    }

    tx.commit().await.context("commit transaction failed")?;

    tracing::info!(
        %run_id,
        scan_type,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "persisted scan report"
    );

    Ok(run_id)
}

pub async fn latest_scan_run(pool: &sqlx::PgPool) -> anyhow::Result<Option<StoredScanRun>> {
    let row: Option<(
        Uuid,
        String,
        i32,
        i32,
        i32,
        i32,
        i32,
        i64,
        DateTime<Utc>,
    )> = sqlx::query_as(
        "SELECT id, scan_type, total_requested, succeeded, failed, buy_count, sell_count, duration_ms, created_at \
         FROM scan_runs ORDER BY created_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
    .context("latest scan run failed")?;

    Ok(row.map(
        |(id, scan_type, total_requested, succeeded, failed, buy_count, sell_count, duration_ms, created_at)| {
            StoredScanRun {
                id,
                scan_type,
                total_requested,
                succeeded,
                failed,
                buy_count,
                sell_count,
                duration_ms,
                created_at,
            }
        },
    ))
}
