//! SQLite storage for symbol metadata.

mod model;
mod repository;

pub use model::{StockMetadataChangesetDB, StockMetadataDB};
pub use repository::MetadataRepository;
