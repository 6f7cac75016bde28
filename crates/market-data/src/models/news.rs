use serde::{Deserialize, Serialize};

/// A company news headline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub headline: String,
    pub summary: String,
    pub source: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Publication time, unix seconds
    pub datetime: i64,
    /// Symbols the provider tagged the article with
    pub related: String,
}
