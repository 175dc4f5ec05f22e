use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use candlewatch_core::analysis::StockAnalyzer;
use candlewatch_core::domain::{ScanSummary, StockAnalysis};
use candlewatch_core::storage::alerts::StoredAlert;
use candlewatch_core::storage::scans::StoredScanRun;
use candlewatch_core::storage::stocks::StoredStock;
use candlewatch_core::storage::{self, alerts, lock, scans, settings as settings_store, stocks};
use candlewatch_core::{market, universe};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_settings = candlewatch_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&app_settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match app_settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let source = market::source_from_settings(&app_settings)?;
    let analyzer = Arc::new(StockAnalyzer::new(source));
    let symbols = Arc::new(universe::tracked_symbols(&app_settings));

    tracing::info!(
        source = analyzer.source_name(),
        universe = symbols.len(),
        "analyzer ready"
    );

    let state = AppState {
        pool,
        analyzer,
        symbols,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/stocks", get(get_stocks))
        .route("/api/stocks/:symbol", get(get_stock))
        .route("/api/chart/:symbol", get(get_chart))
        .route("/api/alerts", get(get_alerts))
        .route("/api/symbols", get(get_symbols))
        .route("/api/scan", post(run_scan))
        .route("/api/settings", get(get_settings).put(put_settings))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    pool: Option<PgPool>,
    analyzer: Arc<StockAnalyzer>,
    symbols: Arc<Vec<String>>,
}

impl AppState {
    fn require_pool(&self) -> Result<&PgPool, StatusCode> {
        self.pool.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }
}

fn internal(e: anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(&e);
    tracing::error!(error = %e, "request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    total_stocks: i64,
    buy_alerts: i64,
    sell_alerts: i64,
    recent_alerts: Vec<StoredAlert>,
    top_buy_alerts: Vec<StoredAlert>,
    top_sell_alerts: Vec<StoredAlert>,
    last_scan: Option<StoredScanRun>,
}

async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, StatusCode> {
    let pool = state.require_pool()?;

    let total_stocks = stocks::count_stocks(pool).await.map_err(internal)?;
    let buy_alerts = alerts::count_alerts(pool, Some("BUY"))
        .await
        .map_err(internal)?;
    let sell_alerts = alerts::count_alerts(pool, Some("SELL"))
        .await
        .map_err(internal)?;
    let recent_alerts = alerts::recent_alerts(pool, 10).await.map_err(internal)?;
    let top_buy_alerts = alerts::top_alerts_by_strength(pool, "BUY", 5)
        .await
        .map_err(internal)?;
    let top_sell_alerts = alerts::top_alerts_by_strength(pool, "SELL", 5)
        .await
        .map_err(internal)?;
    let last_scan = scans::latest_scan_run(pool).await.map_err(internal)?;

    Ok(Json(DashboardResponse {
        total_stocks,
        buy_alerts,
        sell_alerts,
        recent_alerts,
        top_buy_alerts,
        top_sell_alerts,
        last_scan,
    }))
}

#[derive(Debug, Deserialize)]
struct StocksQuery {
    trend: Option<String>,
    signal: Option<String>,
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
struct StocksResponse {
    stocks: Vec<StoredStock>,
    total: i64,
    page: i64,
    per_page: i64,
}

async fn get_stocks(
    State(state): State<AppState>,
    Query(query): Query<StocksQuery>,
) -> Result<Json<StocksResponse>, StatusCode> {
    let pool = state.require_pool()?;
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(50);

    if page < 1 || !(1..=200).contains(&per_page) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let (stocks, total) = stocks::list_stocks(
        pool,
        query.trend.as_deref(),
        query.signal.as_deref(),
        page,
        per_page,
    )
    .await
    .map_err(internal)?;

    Ok(Json(StocksResponse {
        stocks,
        total,
        page,
        per_page,
    }))
}

async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<StockAnalysis>, StatusCode> {
    let symbol = symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let today = Utc::now().date_naive();
    let analysis = state.analyzer.analyze(&symbol, today).await;
    Ok(Json(analysis))
}

#[derive(Debug, Serialize)]
struct ChartResponse {
    symbol: String,
    candles: Vec<candlewatch_core::domain::EnrichedCandle>,
    signals: Vec<candlewatch_core::domain::Signal>,
}

async fn get_chart(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ChartResponse>, StatusCode> {
    let symbol = symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let today = Utc::now().date_naive();
    let analysis = state.analyzer.analyze(&symbol, today).await;
    if analysis.error.is_some() {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(ChartResponse {
        symbol: analysis.symbol,
        candles: analysis.candles,
        signals: analysis.signal_history,
    }))
}

#[derive(Debug, Deserialize)]
struct AlertsQuery {
    kind: Option<String>,
    symbol: Option<String>,
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
struct AlertsResponse {
    alerts: Vec<StoredAlert>,
    total: i64,
    page: i64,
    per_page: i64,
}

async fn get_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsResponse>, StatusCode> {
    let pool = state.require_pool()?;
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(50);

    if page < 1 || !(1..=200).contains(&per_page) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let kind = query.kind.map(|k| k.to_ascii_uppercase());
    let symbol = query.symbol.map(|s| s.trim().to_ascii_uppercase());

    let (alerts, total) = alerts::list_alerts(
        pool,
        kind.as_deref(),
        symbol.as_deref(),
        page,
        per_page,
    )
    .await
    .map_err(internal)?;

    Ok(Json(AlertsResponse {
        alerts,
        total,
        page,
        per_page,
    }))
}

async fn get_symbols(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.symbols.as_ref().clone())
}

#[derive(Debug, Default, Deserialize)]
struct ScanRequest {
    symbols: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ScanResponse {
    summary: ScanSummary,
    duration_ms: u64,
    /// Top signals only; the full result set is persisted.
    buy_signals: Vec<StockAnalysis>,
    sell_signals: Vec<StockAnalysis>,
    persisted: bool,
    run_id: Option<Uuid>,
}

const SCAN_RESPONSE_TOP_N: usize = 10;

async fn run_scan(
    State(state): State<AppState>,
    body: Option<Json<ScanRequest>>,
) -> Result<Json<ScanResponse>, StatusCode> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let symbols: Vec<String> = match request.symbols {
        Some(list) => {
            let joined = list.join(",");
            let parsed = universe::parse_symbol_list(&joined);
            if parsed.is_empty() {
                return Err(StatusCode::BAD_REQUEST);
            }
            parsed
        }
        None => state.symbols.as_ref().clone(),
    };

    let today = Utc::now().date_naive();

    // The scan month lock keeps overlapping manual/scheduled runs from
    // writing interleaved results.
    let locked_pool = match &state.pool {
        Some(pool) => {
            let acquired = lock::try_acquire_scan_lock(pool, today)
                .await
                .map_err(internal)?;
            if !acquired {
                return Err(StatusCode::CONFLICT);
            }
            Some(pool)
        }
        None => None,
    };

    let report = state.analyzer.scan(&symbols, today).await;

    let mut run_id = None;
    if let Some(pool) = locked_pool {
        let persisted = scans::persist_scan_report(pool, &report, "manual").await;
        let _ = lock::release_scan_lock(pool, today).await;
        run_id = Some(persisted.map_err(internal)?);
    }

    let summary = report.summary();
    Ok(Json(ScanResponse {
        summary,
        duration_ms: report.duration_ms,
        buy_signals: report
            .buy_signals
            .into_iter()
            .take(SCAN_RESPONSE_TOP_N)
            .collect(),
        sell_signals: report
            .sell_signals
            .into_iter()
            .take(SCAN_RESPONSE_TOP_N)
            .collect(),
        persisted: run_id.is_some(),
        run_id,
    }))
}

async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>, StatusCode> {
    let pool = state.require_pool()?;
    let all = settings_store::all_settings(pool).await.map_err(internal)?;
    Ok(Json(all))
}

async fn put_settings(
    State(state): State<AppState>,
    Json(updates): Json<BTreeMap<String, String>>,
) -> Result<StatusCode, StatusCode> {
    let pool = state.require_pool()?;
    if updates.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    for (key, value) in &updates {
        settings_store::put_setting(pool, key, value)
            .await
            .map_err(internal)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
