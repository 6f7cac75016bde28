//! Database models for symbol metadata.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::warn;
use std::str::FromStr;

use crate::utils::{format_timestamp, parse_timestamp};
use stockwatch_core::metadata::{AssetType, MetadataUpdate, StockMetadata};

#[derive(Queryable, Selectable, Insertable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stock_metadata)]
#[diesel(primary_key(symbol))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StockMetadataDB {
    pub symbol: String,
    pub name: String,
    pub asset_type: String,
    pub currency: String,
    pub exchange: Option<String>,
    pub country: Option<String>,
    pub isin: Option<String>,
    pub wkn: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub yahoo_symbol: Option<String>,
    pub stooq_symbol: Option<String>,
    pub finnhub_symbol: Option<String>,
    pub is_active: bool,
    pub last_updated: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = crate::schema::stock_metadata)]
pub struct StockMetadataChangesetDB {
    pub name: Option<String>,
    pub asset_type: Option<String>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub country: Option<String>,
    pub isin: Option<String>,
    pub wkn: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub yahoo_symbol: Option<String>,
    pub stooq_symbol: Option<String>,
    pub finnhub_symbol: Option<String>,
    pub last_updated: String,
}

impl From<StockMetadata> for StockMetadataDB {
    fn from(metadata: StockMetadata) -> Self {
        Self {
            symbol: metadata.symbol,
            name: metadata.name,
            asset_type: metadata.asset_type.as_str().to_string(),
            currency: metadata.currency,
            exchange: metadata.exchange,
            country: metadata.country,
            isin: metadata.isin,
            wkn: metadata.wkn,
            sector: metadata.sector,
            industry: metadata.industry,
            yahoo_symbol: metadata.yahoo_symbol,
            stooq_symbol: metadata.stooq_symbol,
            finnhub_symbol: metadata.finnhub_symbol,
            is_active: metadata.is_active,
            last_updated: format_timestamp(&metadata.last_updated),
        }
    }
}

impl From<StockMetadataDB> for StockMetadata {
    fn from(row: StockMetadataDB) -> Self {
        let asset_type = AssetType::from_str(&row.asset_type).unwrap_or_else(|e| {
            warn!("{} for {}, treating as stock", e, row.symbol);
            AssetType::Stock
        });
        Self {
            asset_type,
            last_updated: parse_timestamp(&row.last_updated),
            symbol: row.symbol,
            name: row.name,
            currency: row.currency,
            exchange: row.exchange,
            country: row.country,
            isin: row.isin,
            wkn: row.wkn,
            sector: row.sector,
            industry: row.industry,
            yahoo_symbol: row.yahoo_symbol,
            stooq_symbol: row.stooq_symbol,
            finnhub_symbol: row.finnhub_symbol,
            is_active: row.is_active,
        }
    }
}

impl StockMetadataChangesetDB {
    pub fn from_update(update: &MetadataUpdate, updated_at: DateTime<Utc>) -> Self {
        Self {
            name: update.name.clone(),
            asset_type: update.asset_type.map(|t| t.as_str().to_string()),
            currency: update.currency.clone(),
            exchange: update.exchange.clone(),
            country: update.country.clone(),
            isin: update.isin.clone(),
            wkn: update.wkn.clone(),
            sector: update.sector.clone(),
            industry: update.industry.clone(),
            yahoo_symbol: update.yahoo_symbol.clone(),
            stooq_symbol: update.stooq_symbol.clone(),
            finnhub_symbol: update.finnhub_symbol.clone(),
            last_updated: format_timestamp(&updated_at),
        }
    }
}
