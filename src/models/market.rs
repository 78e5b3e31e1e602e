use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssetQuote {
    pub price: f64,
    /// Percent, e.g. 12.3 for +12.3%
    #[serde(rename = "change24h")]
    pub change_24h: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcap: Option<f64>,
}

/// Bounded [0, 100] fear & greed reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SentimentIndex {
    pub value: u8,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MarketIndicators {
    /// Quotes keyed by reference asset (`sol`, `btc`, `eth`)
    #[serde(flatten)]
    pub assets: BTreeMap<String, AssetQuote>,
    #[serde(rename = "fearGreed", default)]
    pub sentiment: Option<SentimentIndex>,
}

impl MarketIndicators {
    pub fn quote(&self, key: &str) -> Option<&AssetQuote> {
        self.assets.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompetitorStats {
    pub name: String,
    pub tvl: f64,
    #[serde(rename = "vol24h")]
    pub volume_24h: f64,
    #[serde(rename = "vol7d")]
    pub volume_7d: f64,
}

/// Competitors keyed by protocol slug.
pub type CompetitorBoard = BTreeMap<String, CompetitorStats>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RedditPost {
    pub subreddit: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: i64,
    pub url: String,
    pub created: f64,
    pub is_relevant: bool,
    pub flair: String,
}
