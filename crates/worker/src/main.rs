use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use candlewatch_core::analysis::StockAnalyzer;
use candlewatch_core::storage::{lock, scans};
use candlewatch_core::{market, storage, universe};

#[derive(Debug, Parser)]
#[command(name = "candlewatch_worker")]
struct Args {
    /// Comma-separated symbol override for this run (defaults to the
    /// tracked NSE universe).
    #[arg(long)]
    symbols: Option<String>,

    /// Recorded with the scan run: "scheduled" (cron) or "manual".
    #[arg(long, default_value = "scheduled")]
    trigger: String,

    /// Do everything except writing to the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = candlewatch_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    anyhow::ensure!(
        args.trigger == "scheduled" || args.trigger == "manual",
        "--trigger must be 'scheduled' or 'manual' (got {})",
        args.trigger
    );

    let symbols = match args.symbols.as_deref() {
        Some(raw) => {
            let parsed = universe::parse_symbol_list(raw);
            anyhow::ensure!(!parsed.is_empty(), "--symbols parsed to an empty list");
            parsed
        }
        None => universe::tracked_symbols(&settings),
    };

    let source = market::source_from_settings(&settings)?;
    let analyzer = StockAnalyzer::new(source);

    let today = chrono::Utc::now().date_naive();
    let report = analyzer.scan(&symbols, today).await;
    let summary = report.summary();

    if args.dry_run {
        tracing::info!(
            dry_run = true,
            total = summary.total_requested,
            succeeded = summary.succeeded,
            failed = summary.failed,
            buys = summary.buy_count,
            sells = summary.sell_count,
            "scan finished (dry-run, not persisted)"
        );
        return Ok(());
    }

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    storage::migrate(&pool).await?;

    let acquired = lock::try_acquire_scan_lock(&pool, today).await?;
    if !acquired {
        tracing::warn!(%today, "scan lock not acquired; another run in progress");
        return Ok(());
    }

    let persisted = scans::persist_scan_report(&pool, &report, &args.trigger).await;
    let _ = lock::release_scan_lock(&pool, today).await;

    match persisted {
        Ok(run_id) => {
            tracing::info!(
                %run_id,
                trigger = args.trigger,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "scan persisted"
            );
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "failed to persist scan report");
            return Err(err);
        }
    }

    Ok(())
}

fn init_sentry(
    settings: &candlewatch_core::config::Settings,
) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
