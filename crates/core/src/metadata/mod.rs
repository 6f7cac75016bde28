//! Tracked symbols and their descriptive data.

mod metadata_model;
mod metadata_service;
mod metadata_traits;

pub use metadata_model::{AssetType, MetadataUpdate, StockMetadata};
pub use metadata_service::MetadataService;
pub use metadata_traits::{MetadataRepositoryTrait, MetadataServiceTrait};
