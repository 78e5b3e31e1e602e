use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Alert, BusinessLine, CompetitorBoard, MarketIndicators, PoolRecord, RedditPost};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlatformTotals {
    pub tvl: f64,
    #[serde(rename = "vol24h")]
    pub volume_24h: f64,
    #[serde(rename = "vol7d")]
    pub volume_7d: f64,
    #[serde(rename = "fee24h")]
    pub fee_24h: f64,
    #[serde(rename = "fee7d")]
    pub fee_7d: f64,
    /// Protocol share of `fee_24h`
    #[serde(rename = "rev24h")]
    pub revenue_24h: f64,
    #[serde(rename = "active")]
    pub active_pools: u64,
    /// Pool count reported by the listing's pagination, not the number of records fetched
    #[serde(rename = "total")]
    pub total_pools: u64,
    #[serde(rename = "tvlChange", skip_serializing_if = "Option::is_none")]
    pub tvl_change: Option<f64>,
    #[serde(rename = "volChange", skip_serializing_if = "Option::is_none")]
    pub volume_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BusinessLineAggregate {
    pub tvl: f64,
    #[serde(rename = "vol24h")]
    pub volume_24h: f64,
    #[serde(rename = "fee24h")]
    pub fee_24h: f64,
    pub count: u64,
}

pub type BusinessLineBoard = BTreeMap<BusinessLine, BusinessLineAggregate>;

/// Top-N views borrowing from the classified record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingSet<'a> {
    #[serde(rename = "topTvl")]
    pub by_tvl: Vec<&'a PoolRecord>,
    #[serde(rename = "topVol")]
    pub by_volume: Vec<&'a PoolRecord>,
    #[serde(rename = "topFtv")]
    pub by_fee_to_tvl: Vec<&'a PoolRecord>,
    #[serde(rename = "topApr")]
    pub by_fee_apr: Vec<&'a PoolRecord>,
}

/// Enrichment produced by the best-effort collaborators.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Enrichment {
    pub competitors: CompetitorBoard,
    pub ai_insight: String,
    pub ai_public: String,
    pub daily_report: String,
    pub x_trends: Vec<serde_json::Value>,
    pub reddit_hot: Vec<RedditPost>,
}

/// The merged document published once per date.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySnapshot<'a> {
    pub date: String,
    pub ts: String,
    pub platform: &'a PlatformTotals,
    pub biz_lines: &'a BusinessLineBoard,
    pub rankings: &'a RankingSet<'a>,
    #[serde(rename = "xStocks")]
    pub tokenized_equity: &'a [&'a PoolRecord],
    pub pools: &'a [PoolRecord],
    pub market: &'a MarketIndicators,
    pub competitors: &'a CompetitorBoard,
    pub alerts: &'a [Alert],
    pub ai_insight: &'a str,
    pub ai_public: &'a str,
    pub daily_report: &'a str,
    pub x_trends: &'a [serde_json::Value],
    pub reddit_hot: &'a [RedditPost],
}

/// A published snapshot read back from the store.
///
/// Every field defaults so documents from older runs, or hand-edited ones,
/// still load; the ranking views are not read back.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredSnapshot {
    pub date: String,
    pub ts: String,
    pub platform: PlatformTotals,
    pub biz_lines: BusinessLineBoard,
    #[serde(rename = "xStocks")]
    pub tokenized_equity: Vec<PoolRecord>,
    pub pools: Vec<PoolRecord>,
    pub market: MarketIndicators,
    pub competitors: CompetitorBoard,
    pub alerts: Vec<Alert>,
    pub ai_insight: String,
    pub ai_public: String,
    pub daily_report: String,
}
