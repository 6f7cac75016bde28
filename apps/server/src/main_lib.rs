use std::sync::Arc;

use stockwatch_core::{
    cache::{CacheConfig, DurableReprobePolicy, StockCache},
    historical::{HistoricalImportService, HistoricalServiceTrait, HttpDownloader, ImportConfig},
    market_data::{MarketDataService, MarketDataServiceTrait},
    metadata::{MetadataService, MetadataServiceTrait},
};
use stockwatch_market_data::{
    AlphaVantageProvider, Clock, FinnhubProvider, MarketDataProvider, ProviderRegistry,
    SystemClock, YahooProvider,
};
use stockwatch_storage_sqlite::{
    cache::CacheRepository,
    db::{self, write_actor},
    historical::{HistoricalRepository, ImportLogRepository, JobRunRepository},
    metadata::MetadataRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub market_data_service: Arc<dyn MarketDataServiceTrait>,
    pub metadata_service: Arc<dyn MetadataServiceTrait>,
    pub cron_secret: Option<String>,
}

pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

fn build_registry(config: &Config, clock: Arc<dyn Clock>) -> Arc<ProviderRegistry> {
    if config.finnhub_api_key.is_none() {
        tracing::warn!("FINNHUB_API_KEY not set, Finnhub will report unavailable");
    }
    if config.alpha_vantage_api_key.is_none() {
        tracing::warn!("ALPHA_VANTAGE_API_KEY not set, Alpha Vantage will report unavailable");
    }

    let providers: Vec<Arc<dyn MarketDataProvider>> = vec![
        Arc::new(YahooProvider::new()),
        Arc::new(FinnhubProvider::new(config.finnhub_api_key.clone())),
        Arc::new(AlphaVantageProvider::new(
            config.alpha_vantage_api_key.clone(),
        )),
    ];
    Arc::new(ProviderRegistry::with_clock(providers, clock))
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = build_registry(config, clock.clone());

    let cache_repository = Arc::new(CacheRepository::new(pool.clone(), writer.clone()));
    let cache_config = CacheConfig {
        reprobe: config
            .cache_reprobe
            .map(DurableReprobePolicy::After)
            .unwrap_or_default(),
        ..CacheConfig::default()
    };
    let cache = Arc::new(StockCache::new(
        cache_repository,
        clock.clone(),
        cache_config,
    ));

    let metadata_repository = Arc::new(MetadataRepository::new(pool.clone(), writer.clone()));
    let metadata_service: Arc<dyn MetadataServiceTrait> =
        Arc::new(MetadataService::new(metadata_repository, clock.clone()));

    let import_config = ImportConfig::default();
    let downloader = Arc::new(HttpDownloader::new(&import_config.user_agent)?);
    let historical_service: Arc<dyn HistoricalServiceTrait> =
        Arc::new(HistoricalImportService::new(
            Arc::new(HistoricalRepository::new(pool.clone(), writer.clone())),
            Arc::new(ImportLogRepository::new(pool.clone(), writer.clone())),
            Arc::new(JobRunRepository::new(pool.clone(), writer.clone())),
            metadata_service.clone(),
            downloader,
            clock.clone(),
            import_config,
        ));

    let market_data_service: Arc<dyn MarketDataServiceTrait> =
        Arc::new(MarketDataService::new(
            registry,
            cache,
            historical_service,
            metadata_service.clone(),
            clock,
        ));

    Ok(Arc::new(AppState {
        market_data_service,
        metadata_service,
        cron_secret: config.cron_secret.clone(),
    }))
}
