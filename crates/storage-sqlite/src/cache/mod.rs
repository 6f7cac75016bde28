//! SQLite storage for the durable cache tier.

mod model;
mod repository;

pub use model::StockCacheDB;
pub use repository::CacheRepository;
