use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub finnhub_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    /// Bearer token for the cron endpoint. Unset leaves it open.
    pub cron_secret: Option<String>,
    /// Zero disables the loop.
    pub historical_update_interval: Duration,
    /// Zero disables the loop.
    pub cache_cleanup_interval: Duration,
    pub cache_reprobe: Option<Duration>,
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_path: "./db/stockwatch.db".to_string(),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(30_000),
            finnhub_api_key: None,
            alpha_vantage_api_key: None,
            cron_secret: None,
            historical_update_interval: Duration::from_secs(24 * 60 * 60),
            cache_cleanup_interval: Duration::from_secs(60 * 60),
            cache_reprobe: None,
            log_format: "text".to_string(),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match env_opt("SW_LISTEN_ADDR") {
            Some(addr) => addr
                .parse()
                .with_context(|| format!("Invalid SW_LISTEN_ADDR: {}", addr))?,
            None => defaults.listen_addr,
        };
        let cors_allow = env_opt("SW_CORS_ALLOW_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_allow);
        let timeout_ms: u64 = env_opt("SW_REQUEST_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30_000);

        Ok(Self {
            listen_addr,
            db_path: env_opt("SW_DB_PATH").unwrap_or(defaults.db_path),
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            finnhub_api_key: env_opt("FINNHUB_API_KEY"),
            alpha_vantage_api_key: env_opt("ALPHA_VANTAGE_API_KEY"),
            cron_secret: env_opt("SW_CRON_SECRET"),
            historical_update_interval: env_secs(
                "SW_HISTORICAL_UPDATE_INTERVAL_SECS",
                defaults.historical_update_interval,
            ),
            cache_cleanup_interval: env_secs(
                "SW_CACHE_CLEANUP_INTERVAL_SECS",
                defaults.cache_cleanup_interval,
            ),
            cache_reprobe: env_opt("SW_CACHE_REPROBE_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs),
            log_format: env_opt("SW_LOG_FORMAT").unwrap_or(defaults.log_format),
        })
    }
}
