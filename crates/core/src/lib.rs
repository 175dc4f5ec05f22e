pub mod analysis;
pub mod domain;
pub mod error;
pub mod market;
pub mod storage;
pub mod time;
pub mod universe;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub use_mock_data: bool,
        pub market_data_base_url: Option<String>,
        pub tracked_symbols: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            // USE_MOCK_DATA defaults to true so a fresh checkout works offline.
            let use_mock_data = std::env::var("USE_MOCK_DATA")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true);

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                use_mock_data,
                market_data_base_url: std::env::var("MARKET_DATA_BASE_URL").ok(),
                tracked_symbols: std::env::var("NSE_SYMBOLS").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }
    }
}
