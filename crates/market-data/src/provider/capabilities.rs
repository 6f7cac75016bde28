//! Provider capability flags.
//!
//! The registry filters adapters by these flags before trying them, so an
//! adapter only has to implement the operations it advertises.

use serde::{Deserialize, Serialize};

/// One kind of data an adapter can serve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Quote,
    Fundamentals,
    Historical,
    News,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Fundamentals => "fundamentals",
            Self::Historical => "historical",
            Self::News => "news",
        }
    }
}

/// Describes what a market data provider can do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Whether the provider serves latest quotes.
    pub quote: bool,

    /// Whether the provider serves fundamental metrics.
    pub fundamentals: bool,

    /// Whether the provider serves historical series.
    pub historical: bool,

    /// Whether the provider serves company news.
    pub news: bool,
}

impl ProviderCapabilities {
    /// True if the flag for `capability` is set.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Quote => self.quote,
            Capability::Fundamentals => self.fundamentals,
            Capability::Historical => self.historical,
            Capability::News => self.news,
        }
    }
}
