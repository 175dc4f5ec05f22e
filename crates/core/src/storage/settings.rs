use anyhow::Context;
use std::collections::BTreeMap;

pub async fn get_setting(pool: &sqlx::PgPool, key: &str) -> anyhow::Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM app_settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("get setting failed")?;
    Ok(row.map(|(value,)| value))
}

pub async fn put_setting(pool: &sqlx::PgPool, key: &str, value: &str) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO app_settings (key, value, updated_at) VALUES ($1, $2, now()) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .context("put setting failed")?;
    Ok(())
}

pub async fn all_settings(pool: &sqlx::PgPool) -> anyhow::Result<BTreeMap<String, String>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT key, value FROM app_settings ORDER BY key ASC")
            .fetch_all(pool)
            .await
            .context("list settings failed")?;
    Ok(rows.into_iter().collect())
}
