use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use stockwatch_market_data::Clock;

use super::metadata_model::{MetadataUpdate, StockMetadata};
use super::metadata_traits::{MetadataRepositoryTrait, MetadataServiceTrait};
use crate::errors::{Error, Result};

const SEARCH_LIMIT: usize = 20;

pub struct MetadataService {
    repository: Arc<dyn MetadataRepositoryTrait>,
    clock: Arc<dyn Clock>,
}

impl MetadataService {
    pub fn new(repository: Arc<dyn MetadataRepositoryTrait>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }
}

/// Turns a missing table into `fallback`, passing other errors through.
fn or_unavailable<T>(result: Result<T>, fallback: T, operation: &str) -> Result<T> {
    match result {
        Err(e) if e.is_unavailable() => {
            warn!("Metadata table not available for {}: {}", operation, e);
            Ok(fallback)
        }
        other => other,
    }
}

#[async_trait]
impl MetadataServiceTrait for MetadataService {
    async fn ensure_metadata_exists(&self, symbol: &str, partial: MetadataUpdate) -> Result<()> {
        if symbol.trim().is_empty() {
            return Err(Error::Validation(
                crate::errors::ValidationError::MissingField("symbol".to_string()),
            ));
        }
        let metadata = StockMetadata::with_defaults(symbol, &partial, self.clock.now());
        let inserted = or_unavailable(
            self.repository.insert_if_missing(metadata).await,
            false,
            "ensure_metadata_exists",
        )?;
        if inserted {
            debug!("Created metadata for {}", symbol.to_uppercase());
        }
        Ok(())
    }

    fn get_metadata(&self, symbol: &str) -> Result<Option<StockMetadata>> {
        or_unavailable(
            self.repository.get_metadata(&symbol.trim().to_uppercase()),
            None,
            "get_metadata",
        )
    }

    fn get_active_symbols(&self) -> Result<Vec<String>> {
        or_unavailable(
            self.repository.get_active_symbols(),
            Vec::new(),
            "get_active_symbols",
        )
    }

    async fn deactivate_symbol(&self, symbol: &str) -> Result<()> {
        or_unavailable(
            self.repository
                .set_active(&symbol.trim().to_uppercase(), false)
                .await,
            (),
            "deactivate_symbol",
        )
    }

    async fn update_metadata(&self, symbol: &str, update: MetadataUpdate) -> Result<()> {
        or_unavailable(
            self.repository
                .update_metadata(&symbol.trim().to_uppercase(), &update, self.clock.now())
                .await,
            (),
            "update_metadata",
        )
    }

    fn search_symbols(&self, query: &str) -> Result<Vec<StockMetadata>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        or_unavailable(
            self.repository.search(query, SEARCH_LIMIT),
            Vec::new(),
            "search_symbols",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DatabaseError;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use stockwatch_market_data::ManualClock;

    struct MissingTableRepository;

    #[async_trait]
    impl MetadataRepositoryTrait for MissingTableRepository {
        fn get_metadata(&self, _symbol: &str) -> Result<Option<StockMetadata>> {
            Err(DatabaseError::Unavailable("no such table: stock_metadata".into()).into())
        }
        fn get_active_symbols(&self) -> Result<Vec<String>> {
            Err(DatabaseError::Unavailable("no such table: stock_metadata".into()).into())
        }
        fn search(&self, _query: &str, _limit: usize) -> Result<Vec<StockMetadata>> {
            Err(DatabaseError::Unavailable("no such table: stock_metadata".into()).into())
        }
        async fn insert_if_missing(&self, _metadata: StockMetadata) -> Result<bool> {
            Err(DatabaseError::Unavailable("no such table: stock_metadata".into()).into())
        }
        async fn update_metadata(
            &self,
            _symbol: &str,
            _update: &MetadataUpdate,
            _updated_at: DateTime<Utc>,
        ) -> Result<()> {
            Err(DatabaseError::QueryFailed("disk I/O error".into()).into())
        }
        async fn set_active(&self, _symbol: &str, _active: bool) -> Result<()> {
            Err(DatabaseError::Unavailable("no such table: stock_metadata".into()).into())
        }
    }

    #[derive(Default)]
    struct RecordingRepository {
        inserted: Mutex<Vec<StockMetadata>>,
        searches: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl MetadataRepositoryTrait for RecordingRepository {
        fn get_metadata(&self, symbol: &str) -> Result<Option<StockMetadata>> {
            Ok(self
                .inserted
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.symbol == symbol)
                .cloned())
        }
        fn get_active_symbols(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn search(&self, query: &str, limit: usize) -> Result<Vec<StockMetadata>> {
            self.searches.lock().unwrap().push((query.to_string(), limit));
            Ok(Vec::new())
        }
        async fn insert_if_missing(&self, metadata: StockMetadata) -> Result<bool> {
            let mut rows = self.inserted.lock().unwrap();
            if rows.iter().any(|m| m.symbol == metadata.symbol) {
                return Ok(false);
            }
            rows.push(metadata);
            Ok(true)
        }
        async fn update_metadata(
            &self,
            _symbol: &str,
            _update: &MetadataUpdate,
            _updated_at: DateTime<Utc>,
        ) -> Result<()> {
            Ok(())
        }
        async fn set_active(&self, _symbol: &str, _active: bool) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_missing_table_degrades_to_empty() {
        let service = MetadataService::new(
            Arc::new(MissingTableRepository),
            Arc::new(ManualClock::default()),
        );
        assert!(service.get_active_symbols().unwrap().is_empty());
        assert!(service.get_metadata("AAPL").unwrap().is_none());
        assert!(service.search_symbols("app").unwrap().is_empty());
        service
            .ensure_metadata_exists("AAPL", MetadataUpdate::default())
            .await
            .unwrap();
        service.deactivate_symbol("AAPL").await.unwrap();

        // other storage failures still surface
        assert!(service
            .update_metadata("AAPL", MetadataUpdate::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let repo = Arc::new(RecordingRepository::default());
        let service = MetadataService::new(repo.clone(), Arc::new(ManualClock::default()));

        service
            .ensure_metadata_exists("alv.de", MetadataUpdate::named("Allianz"))
            .await
            .unwrap();
        service
            .ensure_metadata_exists("ALV.DE", MetadataUpdate::named("Other"))
            .await
            .unwrap();

        let stored = service.get_metadata("alv.de").unwrap().unwrap();
        assert_eq!(stored.name, "Allianz");
        assert_eq!(stored.currency, "EUR");
        assert_eq!(repo.inserted.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_search_limit() {
        let repo = Arc::new(RecordingRepository::default());
        let service = MetadataService::new(repo.clone(), Arc::new(ManualClock::default()));
        service.search_symbols("  sap ").unwrap();
        service.search_symbols("").unwrap();
        assert_eq!(
            *repo.searches.lock().unwrap(),
            vec![("sap".to_string(), 20)]
        );
    }
}
