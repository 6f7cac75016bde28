#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
    use stockwatch_market_data::{
        Clock, HistoricalPoint, HistoricalRange, ManualClock, MarketDataError, MarketDataProvider,
        NewsArticle, ProviderCapabilities, ProviderRegistry, Quote,
    };

    use crate::cache::{CacheConfig, CacheKind, CacheRepositoryTrait, StockCache, StoredCacheEntry};
    use crate::errors::{DatabaseError, Error, Result};
    use crate::historical::{
        BulkUpdateSummary, HistoricalServiceTrait, ImportResult, ImportSource,
    };
    use crate::market_data::{
        HealthStatus, ImportRequest, MarketDataService, MarketDataServiceTrait,
    };
    use crate::metadata::{MetadataServiceTrait, MetadataUpdate, StockMetadata};
    use crate::performance::PerformancePeriod;

    // --- Durable tier without a table: the cache runs memory-only ---
    struct NoTableCacheRepository;

    #[async_trait]
    impl CacheRepositoryTrait for NoTableCacheRepository {
        fn get_entry(&self, _cache_key: &str) -> Result<Option<StoredCacheEntry>> {
            Err(DatabaseError::Unavailable("no such table: stock_cache".into()).into())
        }
        async fn upsert_entry(&self, _entry: StoredCacheEntry) -> Result<()> {
            Err(DatabaseError::Unavailable("no such table: stock_cache".into()).into())
        }
        async fn delete_for_symbol(&self, _s: &str, _k: Option<CacheKind>) -> Result<usize> {
            Err(DatabaseError::Unavailable("no such table: stock_cache".into()).into())
        }
        async fn delete_expired(&self, _now: DateTime<Utc>) -> Result<usize> {
            Err(DatabaseError::Unavailable("no such table: stock_cache".into()).into())
        }
    }

    // --- Provider stub ---
    #[derive(Default)]
    struct StubProvider {
        quote_calls: AtomicUsize,
        history_calls: AtomicUsize,
        news: HashMap<String, Vec<NewsArticle>>,
        history: Vec<HistoricalPoint>,
        fail_quotes: bool,
    }

    #[async_trait]
    impl MarketDataProvider for StubProvider {
        fn name(&self) -> &'static str {
            "Stub"
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                quote: true,
                fundamentals: false,
                historical: true,
                news: true,
            }
        }

        async fn get_quote(&self, symbol: &str) -> std::result::Result<Quote, MarketDataError> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_quotes {
                return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
            }
            Ok(Quote::new(symbol, 110.0, 100.0, "Stub"))
        }

        async fn get_historical(
            &self,
            _symbol: &str,
            _range: HistoricalRange,
        ) -> std::result::Result<Vec<HistoricalPoint>, MarketDataError> {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            if self.history.is_empty() {
                return Err(MarketDataError::NoDataForRange);
            }
            Ok(self.history.clone())
        }

        async fn get_news(
            &self,
            symbol: &str,
        ) -> std::result::Result<Vec<NewsArticle>, MarketDataError> {
            Ok(self.news.get(symbol).cloned().unwrap_or_default())
        }

        async fn is_available(&self) -> bool {
            !self.fail_quotes
        }
    }

    // --- Historical service fake ---
    #[derive(Default)]
    struct FakeHistorical {
        stored: Mutex<Vec<HistoricalPoint>>,
        /// Rows a network import would add
        importable: Vec<HistoricalPoint>,
        smart_imports: AtomicUsize,
        csv_imports: Mutex<Vec<(String, ImportSource)>>,
    }

    #[async_trait]
    impl HistoricalServiceTrait for FakeHistorical {
        fn get_historical_data(
            &self,
            _symbol: &str,
            _from: Option<NaiveDate>,
            _to: Option<NaiveDate>,
        ) -> Vec<HistoricalPoint> {
            self.stored.lock().unwrap().clone()
        }

        fn get_stored_range(&self, _symbol: &str, _range: HistoricalRange) -> Vec<HistoricalPoint> {
            self.stored.lock().unwrap().clone()
        }

        fn has_historical_data(&self, _symbol: &str) -> bool {
            !self.stored.lock().unwrap().is_empty()
        }

        fn get_last_date(&self, _symbol: &str) -> Option<NaiveDate> {
            self.stored.lock().unwrap().last().map(|p| p.date)
        }

        async fn import_from_csv(
            &self,
            symbol: &str,
            _content: &str,
            source: ImportSource,
        ) -> ImportResult {
            self.csv_imports
                .lock()
                .unwrap()
                .push((symbol.to_string(), source));
            ImportResult {
                success: true,
                symbol: symbol.to_string(),
                records_imported: 1,
                records_skipped: 0,
                records_failed: 0,
                date_range: None,
                error: None,
            }
        }

        async fn import_from_yahoo(&self, symbol: &str, _start: Option<NaiveDate>) -> ImportResult {
            ImportResult::failed(symbol, "not used")
        }

        async fn import_from_stooq(&self, symbol: &str, _market: Option<&str>) -> ImportResult {
            ImportResult::failed(symbol, "not used")
        }

        async fn smart_import(&self, symbol: &str) -> ImportResult {
            self.smart_imports.fetch_add(1, Ordering::SeqCst);
            if self.importable.is_empty() {
                return ImportResult::failed(symbol, "All data sources failed");
            }
            let mut stored = self.stored.lock().unwrap();
            stored.extend(self.importable.iter().cloned());
            ImportResult {
                success: true,
                symbol: symbol.to_string(),
                records_imported: self.importable.len(),
                records_skipped: 0,
                records_failed: 0,
                date_range: None,
                error: None,
            }
        }

        async fn update_symbol(&self, symbol: &str) -> ImportResult {
            ImportResult::up_to_date(symbol)
        }

        async fn update_all_symbols(&self) -> BulkUpdateSummary {
            BulkUpdateSummary::default()
        }

        async fn run_scheduled_update(&self) -> Result<BulkUpdateSummary> {
            Ok(BulkUpdateSummary::default())
        }
    }

    // --- Metadata fake ---
    #[derive(Default)]
    struct FakeMetadata {
        ensured: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl MetadataServiceTrait for FakeMetadata {
        async fn ensure_metadata_exists(&self, symbol: &str, partial: MetadataUpdate) -> Result<()> {
            self.ensured
                .lock()
                .unwrap()
                .push((symbol.to_string(), partial.name));
            Ok(())
        }
        fn get_metadata(&self, _symbol: &str) -> Result<Option<StockMetadata>> {
            Ok(None)
        }
        fn get_active_symbols(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn deactivate_symbol(&self, _symbol: &str) -> Result<()> {
            Ok(())
        }
        async fn update_metadata(&self, _symbol: &str, _u: MetadataUpdate) -> Result<()> {
            Ok(())
        }
        fn search_symbols(&self, _query: &str) -> Result<Vec<StockMetadata>> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        service: MarketDataService,
        provider: Arc<StubProvider>,
        historical: Arc<FakeHistorical>,
        metadata: Arc<FakeMetadata>,
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap()
    }

    fn daily(count: u64, start_close: f64) -> Vec<HistoricalPoint> {
        let last = now().date_naive();
        (0..count)
            .map(|i| {
                let date = last.checked_sub_days(Days::new(count - 1 - i)).unwrap();
                HistoricalPoint::close_only(date, start_close + i as f64)
            })
            .collect()
    }

    fn harness(provider: StubProvider, historical: FakeHistorical) -> Harness {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(now()));
        let provider = Arc::new(provider);
        let registry = Arc::new(ProviderRegistry::with_clock(
            vec![provider.clone() as Arc<dyn MarketDataProvider>],
            clock.clone(),
        ));
        let cache = Arc::new(StockCache::new(
            Arc::new(NoTableCacheRepository),
            clock.clone(),
            CacheConfig::default(),
        ));
        let historical = Arc::new(historical);
        let metadata = Arc::new(FakeMetadata::default());
        let service = MarketDataService::new(
            registry,
            cache,
            historical.clone(),
            metadata.clone(),
            clock,
        );
        Harness {
            service,
            provider,
            historical,
            metadata,
        }
    }

    fn article(id: &str) -> NewsArticle {
        NewsArticle {
            id: id.to_string(),
            headline: "Quarterly results".to_string(),
            summary: String::new(),
            source: "Wire".to_string(),
            url: "https://example.com/a".to_string(),
            image: None,
            datetime: 1_710_000_000,
            related: "ALV".to_string(),
        }
    }

    #[tokio::test]
    async fn test_quote_served_from_cache_on_second_call() {
        let h = harness(StubProvider::default(), FakeHistorical::default());

        let first = h.service.resolve_quote("aapl").await.unwrap();
        assert!(first.success);
        assert!(!first.from_cache);
        assert_eq!(first.provider.as_deref(), Some("Stub"));
        assert_eq!(first.data.as_ref().unwrap().change, 10.0);

        let second = h.service.resolve_quote("AAPL").await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.provider.as_deref(), Some("Stub"));
        assert_eq!(h.provider.quote_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_quote_is_not_cached() {
        let provider = StubProvider {
            fail_quotes: true,
            ..Default::default()
        };
        let h = harness(provider, FakeHistorical::default());

        let first = h.service.resolve_quote("NOPE").await.unwrap();
        assert!(!first.success);
        assert_eq!(first.errors.len(), 1);
        assert_eq!(first.errors[0].provider, "Stub");

        h.service.resolve_quote("NOPE").await.unwrap();
        assert_eq!(h.provider.quote_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_symbol_is_rejected() {
        let h = harness(StubProvider::default(), FakeHistorical::default());
        let err = h.service.resolve_quote("  ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_historical_prefers_stored_rows() {
        let historical = FakeHistorical {
            stored: Mutex::new(daily(10, 100.0)),
            ..Default::default()
        };
        let h = harness(StubProvider::default(), historical);

        let response = h
            .service
            .resolve_historical("SAP.DE", HistoricalRange::OneMonth)
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.provider.as_deref(), Some("database"));
        assert_eq!(response.data.unwrap().len(), 10);
        assert_eq!(h.historical.smart_imports.load(Ordering::SeqCst), 0);
        assert_eq!(h.provider.history_calls.load(Ordering::SeqCst), 0);

        let again = h
            .service
            .resolve_historical("SAP.DE", HistoricalRange::OneMonth)
            .await
            .unwrap();
        assert!(again.from_cache);
        assert_eq!(again.provider.as_deref(), Some("database"));
    }

    #[tokio::test]
    async fn test_thin_store_triggers_import() {
        let historical = FakeHistorical {
            stored: Mutex::new(daily(2, 100.0)),
            importable: daily(30, 50.0),
            ..Default::default()
        };
        let h = harness(StubProvider::default(), historical);

        let response = h
            .service
            .resolve_historical("MSFT", HistoricalRange::ThreeMonths)
            .await
            .unwrap();
        assert_eq!(h.historical.smart_imports.load(Ordering::SeqCst), 1);
        assert_eq!(response.provider.as_deref(), Some("database"));
        assert_eq!(response.data.unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_historical_falls_back_to_providers() {
        let provider = StubProvider {
            history: daily(5, 10.0),
            ..Default::default()
        };
        let h = harness(provider, FakeHistorical::default());

        let response = h
            .service
            .resolve_historical("XYZ", HistoricalRange::OneYear)
            .await
            .unwrap();
        assert_eq!(h.historical.smart_imports.load(Ordering::SeqCst), 1);
        assert_eq!(response.provider.as_deref(), Some("Stub"));
        assert_eq!(response.data.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_historical_total_failure_reports_errors() {
        let h = harness(StubProvider::default(), FakeHistorical::default());
        let response = h
            .service
            .resolve_historical("XYZ", HistoricalRange::OneYear)
            .await
            .unwrap();
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_performance_from_stored_series() {
        let historical = FakeHistorical {
            stored: Mutex::new(daily(40, 100.0)),
            ..Default::default()
        };
        let h = harness(StubProvider::default(), historical);

        let response = h.service.resolve_performance("abc").await.unwrap();
        assert!(response.success);
        let perf = response.data.unwrap();
        assert_eq!(perf.symbol, "ABC");
        assert_eq!(perf.current_price, 139.0);
        let day = perf.period(PerformancePeriod::OneDay).unwrap();
        assert_eq!(day.change, 1.0);
        let week = perf.period(PerformancePeriod::OneWeek).unwrap();
        assert_eq!(week.reference_price, 132.0);
    }

    #[tokio::test]
    async fn test_performance_without_history_fails() {
        let h = harness(StubProvider::default(), FakeHistorical::default());
        let response = h.service.resolve_performance("XYZ").await.unwrap();
        assert!(!response.success);
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn test_news_retries_with_base_symbol() {
        let mut news = HashMap::new();
        news.insert("ALV".to_string(), vec![article("1")]);
        let provider = StubProvider {
            news,
            ..Default::default()
        };
        let h = harness(provider, FakeHistorical::default());

        let response = h.service.resolve_news("alv.de").await.unwrap();
        assert!(response.success);
        assert_eq!(response.data.unwrap()[0].id, "1");
    }

    #[tokio::test]
    async fn test_import_with_csv_registers_metadata() {
        let h = harness(StubProvider::default(), FakeHistorical::default());
        let request = ImportRequest {
            symbol: "sap.de".to_string(),
            csv_content: Some("Date,Close\n2024-01-02,100".to_string()),
            source: Some(ImportSource::YahooCsv),
            name: Some("SAP SE".to_string()),
        };

        let result = h.service.import_historical(request).await.unwrap();
        assert!(result.success);

        let imports = h.historical.csv_imports.lock().unwrap().clone();
        assert_eq!(imports, vec![("SAP.DE".to_string(), ImportSource::YahooCsv)]);
        let ensured = h.metadata.ensured.lock().unwrap().clone();
        assert_eq!(ensured, vec![("SAP.DE".to_string(), Some("SAP SE".to_string()))]);
        assert_eq!(h.historical.smart_imports.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_import_without_csv_uses_network() {
        let historical = FakeHistorical {
            importable: daily(3, 1.0),
            ..Default::default()
        };
        let h = harness(StubProvider::default(), historical);
        let request = ImportRequest {
            symbol: "IBM".to_string(),
            ..Default::default()
        };

        let result = h.service.import_historical(request).await.unwrap();
        assert_eq!(result.records_imported, 3);
        assert_eq!(h.historical.smart_imports.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_health_report() {
        let h = harness(StubProvider::default(), FakeHistorical::default());
        h.service.resolve_historical("XYZ", HistoricalRange::OneYear).await.unwrap();

        let report = h.service.health().await;
        assert_eq!(report.status, HealthStatus::Operational);
        assert_eq!(report.providers.len(), 1);
        assert!(report.providers[0].available);
        assert_eq!(report.providers[0].priority, 10);
        assert_eq!(report.recent_errors.len(), 1);
        assert!(!report.durable_cache_available);
        assert_eq!(report.timestamp, now());
    }
}
