pub mod alert;
pub mod market;
pub mod pool;
pub mod snapshot;

pub use alert::{Alert, AlertCategory, Severity};
pub use market::{AssetQuote, CompetitorBoard, CompetitorStats, MarketIndicators, RedditPost, SentimentIndex};
pub use pool::{BusinessLine, Incentive, PoolRecord};
pub use snapshot::{
    BusinessLineAggregate, BusinessLineBoard, DailySnapshot, Enrichment, PlatformTotals, RankingSet,
    StoredSnapshot,
};
