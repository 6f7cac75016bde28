//! Market data models
//!
//! Canonical shapes every adapter translates into:
//! - `quote` - latest price snapshot (Quote)
//! - `fundamentals` - company metrics (FundamentalSnapshot)
//! - `historical` - daily bars and range tokens (HistoricalPoint, HistoricalRange)
//! - `news` - headlines (NewsArticle)

mod fundamentals;
mod historical;
mod news;
mod quote;

pub use fundamentals::FundamentalSnapshot;
pub use historical::{collapse_intraday, normalize_series, HistoricalPoint, HistoricalRange};
pub use news::NewsArticle;
pub use quote::{change_percent, Quote};
