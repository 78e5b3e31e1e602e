use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{PipelineError, StoreError};
use crate::models::{
    Alert, BusinessLineBoard, CompetitorBoard, CompetitorStats, DailySnapshot, Enrichment, MarketIndicators,
    PlatformTotals, PoolRecord, StoredSnapshot,
};
use crate::sources::byreal::ByrealPools;
use crate::sources::defillama::DefiLlama;
use crate::sources::market::CoinGeckoMarket;
use crate::sources::narrative::{build_digest, insight_prompt, public_prompt, AnthropicNarrative, DigestInputs};
use crate::sources::social::SocialListening;
use crate::sources::{
    CompetitorSource, MarketSource, NarrativeSource, PoolListing, PoolSource, SocialSource, SourceError,
};
use super::alerts::{AlertEngine, SnapshotInputs};
use super::storage::{SnapshotArtifacts, SnapshotStore};
use super::{PoolAggregator, PoolClassifier, PoolRanker};

/// The collaborators a run pulls from. Only `pools` is required to succeed.
pub struct Sources {
    pub pools: Arc<dyn PoolSource>,
    pub market: Arc<dyn MarketSource>,
    pub competitors: Arc<dyn CompetitorSource>,
    pub social: Arc<dyn SocialSource>,
    pub narrative: Arc<dyn NarrativeSource>,
}

impl Sources {
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Ok(Self {
            pools: Arc::new(ByrealPools::new(&config.sources, &config.http)?),
            market: Arc::new(CoinGeckoMarket::new(&config.sources, &config.http)?),
            competitors: Arc::new(DefiLlama::new(&config.sources, &config.http)?),
            social: Arc::new(SocialListening::new(&config.social, &config.http)?),
            narrative: Arc::new(AnthropicNarrative::new(&config.narrative)?),
        })
    }
}

/// What a finished run reports back to the caller.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub date: String,
    pub path: PathBuf,
    pub pools: usize,
    pub alerts: Vec<Alert>,
}

/// Runs one daily snapshot: fetch, classify, aggregate, rank, alert, enrich, publish.
pub struct DailyCollector {
    sources: Sources,
    classifier: PoolClassifier,
    aggregator: PoolAggregator,
    ranker: PoolRanker,
    alerts: AlertEngine,
    store: SnapshotStore,
    platform_slug: String,
    platform_name: String,
    reference_asset: String,
}

impl DailyCollector {
    pub fn new(config: &Config, sources: Sources) -> Self {
        Self {
            sources,
            classifier: PoolClassifier::new(&config.classifier),
            aggregator: PoolAggregator::new(config.ranking.protocol_fee_share),
            ranker: PoolRanker::new(&config.ranking),
            alerts: AlertEngine::new(config.alerts.clone()),
            store: SnapshotStore::new(config.data_dir()),
            platform_slug: config.sources.platform_slug.clone(),
            platform_name: config.sources.platform_name.clone(),
            reference_asset: config.alerts.reference_asset.clone(),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub async fn run(&self, date: NaiveDate, now: DateTime<Utc>, force: bool) -> Result<RunSummary, PipelineError> {
        let day = date.format("%Y-%m-%d").to_string();
        tracing::info!("📊 Daily snapshot {} ({})", day, now.format("%H:%M:%S"));

        if self.store.exists(&day) && !force {
            return Err(StoreError::AlreadyPublished(day).into());
        }

        // [1] primary pool listing
        tracing::info!("[1/6] Fetching pools from {}...", self.sources.pools.name());
        let PoolListing { mut records, total, raw_pages } = self.sources.pools.fetch_pools().await?;
        tracing::info!("  ✓ {} pools ({} listed)", records.len(), total);

        // [2] classify, aggregate, rank
        self.classifier.classify_all(&mut records);
        let (mut platform, biz_lines) = self.aggregator.aggregate(&records, total);
        let rankings = self.ranker.rank(&records);
        let equities = self.ranker.tokenized_equity(&records);
        tracing::info!(
            "[2/6] TVL ${:.0} | 24h Vol ${:.0} | active {}/{} | xStocks {}",
            platform.tvl, platform.volume_24h, platform.active_pools, platform.total_pools, equities.len()
        );

        // [3] market and competitors
        tracing::info!("[3/6] Market & competitors...");
        let market = self.collect_market().await;
        let mut enrichment = Enrichment {
            competitors: self.collect_competitors(&platform).await,
            ..Default::default()
        };

        // [4] alerts against yesterday
        tracing::info!("[4/6] Generating alerts...");
        let yesterday = self.load_previous(date);
        let report = self.alerts.generate(
            &SnapshotInputs { platform: &platform, records: &records, tokenized_equity: &equities },
            &market,
            yesterday.as_ref(),
            now,
        );
        report.deltas.apply(&mut platform);
        let alerts = report.alerts;

        // [5] social listening and narrative
        tracing::info!("[5/6] Social listening & narrative...");
        self.collect_social(&day, &mut enrichment).await;
        self.collect_narrative(&day, &platform, &biz_lines, &market, &alerts, &equities, &mut enrichment).await;

        // [6] publish
        tracing::info!("[6/6] Publishing...");
        let summary = DailySnapshot {
            date: day.clone(),
            ts: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            platform: &platform,
            biz_lines: &biz_lines,
            rankings: &rankings,
            tokenized_equity: &equities,
            pools: &records,
            market: &market,
            competitors: &enrichment.competitors,
            alerts: &alerts,
            ai_insight: &enrichment.ai_insight,
            ai_public: &enrichment.ai_public,
            daily_report: &enrichment.daily_report,
            x_trends: &enrichment.x_trends,
            reddit_hot: &enrichment.reddit_hot,
        };
        let artifacts = SnapshotArtifacts {
            raw_pages: &raw_pages,
            market: &market,
            competitors: &enrichment.competitors,
            summary: &summary,
        };
        let path = self.store.publish(&day, &artifacts, force)?;

        tracing::info!("✅ Done: {} pools, {} alerts", records.len(), alerts.len());
        for alert in &alerts {
            tracing::info!("  {} [{}] {}", alert.severity.icon(), alert.category.as_str(), alert.message);
        }

        Ok(RunSummary { date: day, path, pools: records.len(), alerts })
    }

    async fn collect_market(&self) -> MarketIndicators {
        let mut market = MarketIndicators::default();

        match self.sources.market.fetch_quotes().await {
            Ok(quotes) => {
                market.assets = quotes;
                if let Some(q) = market.quote(&self.reference_asset) {
                    tracing::info!("  ✓ {} ${:.2} ({:+.1}%)", self.reference_asset.to_uppercase(), q.price, q.change_24h);
                }
            }
            Err(e) => tracing::warn!("  ✗ {} quotes unavailable: {}", self.sources.market.name(), e),
        }

        match self.sources.market.fetch_sentiment().await {
            Ok(index) => {
                tracing::info!("  ✓ Fear & Greed {} ({})", index.value, index.label);
                market.sentiment = Some(index);
            }
            Err(e) => tracing::warn!("  ✗ Fear & Greed unavailable: {}", e),
        }

        market
    }

    /// Competitor board with the platform's own figures appended under its slug.
    async fn collect_competitors(&self, platform: &PlatformTotals) -> CompetitorBoard {
        let mut board = match self.sources.competitors.fetch_competitors().await {
            Ok(board) => {
                tracing::info!("  ✓ {} competitors from {}", board.len(), self.sources.competitors.name());
                board
            }
            Err(e) => {
                tracing::warn!("  ✗ {} unavailable: {}", self.sources.competitors.name(), e);
                CompetitorBoard::new()
            }
        };

        board.insert(
            self.platform_slug.clone(),
            CompetitorStats {
                name: self.platform_name.clone(),
                tvl: platform.tvl,
                volume_24h: platform.volume_24h,
                volume_7d: platform.volume_7d,
            },
        );
        board
    }

    /// The snapshot for the day before `date`. Unreadable documents count as missing.
    fn load_previous(&self, date: NaiveDate) -> Option<StoredSnapshot> {
        let prev = date.pred_opt()?.format("%Y-%m-%d").to_string();
        match self.store.load(&prev) {
            Ok(Some(snapshot)) => {
                tracing::debug!("Comparing against {}", prev);
                Some(snapshot)
            }
            Ok(None) => {
                tracing::info!("  No snapshot for {}, skipping day-over-day checks", prev);
                None
            }
            Err(e) => {
                tracing::warn!("  ✗ Could not read snapshot for {}: {}", prev, e);
                None
            }
        }
    }

    async fn collect_social(&self, day: &str, enrichment: &mut Enrichment) {
        match self.sources.social.x_posts().await {
            Ok(posts) => {
                tracing::info!("  ✓ {} X posts", posts.len());
                enrichment.x_trends = posts;
            }
            Err(e) => tracing::warn!("  ✗ X posts unavailable: {}", e),
        }

        match self.sources.social.reddit_posts().await {
            Ok(posts) => {
                tracing::info!("  ✓ {} Reddit posts", posts.len());
                enrichment.reddit_hot = posts;
            }
            Err(e) => tracing::warn!("  ✗ Reddit unavailable: {}", e),
        }

        enrichment.daily_report = self.sources.social.daily_report(day);
        if !enrichment.daily_report.is_empty() {
            tracing::info!("  ✓ Daily report loaded ({} chars)", enrichment.daily_report.chars().count());
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn collect_narrative(
        &self,
        day: &str,
        platform: &PlatformTotals,
        biz_lines: &BusinessLineBoard,
        market: &MarketIndicators,
        alerts: &[Alert],
        equities: &[&PoolRecord],
        enrichment: &mut Enrichment,
    ) {
        let digest = build_digest(&DigestInputs {
            date: day,
            platform_name: &self.platform_name,
            platform,
            biz_lines,
            market,
            reference_asset: &self.reference_asset,
            competitors: &enrichment.competitors,
            alerts,
            tokenized_equity: equities,
        });

        enrichment.ai_insight = self.complete("insight", &insight_prompt(&digest, &self.platform_name)).await;
        enrichment.ai_public = self.complete("public summary", &public_prompt(&digest, &self.platform_name)).await;
    }

    async fn complete(&self, what: &str, prompt: &str) -> String {
        match self.sources.narrative.complete(prompt).await {
            Ok(text) if text.is_empty() => {
                tracing::debug!("  Narrative {} skipped (no output)", what);
                text
            }
            Ok(text) => {
                tracing::info!("  ✓ Narrative {} ({} chars)", what, text.chars().count());
                text
            }
            Err(e) => {
                tracing::warn!("  ✗ Narrative {} failed: {}", what, e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertCategory, AssetQuote, BusinessLine, RedditPost, SentimentIndex};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakePools(Mutex<Result<PoolListing, ()>>);

    #[async_trait]
    impl PoolSource for FakePools {
        fn name(&self) -> &'static str { "fake-pools" }
        async fn fetch_pools(&self) -> Result<PoolListing, SourceError> {
            self.0.lock().unwrap().clone().map_err(|_| SourceError::Status(503))
        }
    }

    struct FakeMarket { fail: bool }

    #[async_trait]
    impl MarketSource for FakeMarket {
        fn name(&self) -> &'static str { "fake-market" }
        async fn fetch_quotes(&self) -> Result<BTreeMap<String, AssetQuote>, SourceError> {
            if self.fail {
                return Err(SourceError::RateLimit);
            }
            let mut quotes = BTreeMap::new();
            quotes.insert("sol".to_string(), AssetQuote { price: 150.0, change_24h: 12.3, mcap: None });
            Ok(quotes)
        }
        async fn fetch_sentiment(&self) -> Result<SentimentIndex, SourceError> {
            if self.fail {
                return Err(SourceError::Network("down".into()));
            }
            Ok(SentimentIndex { value: 50, label: "Neutral".into() })
        }
    }

    struct FakeCompetitors;

    #[async_trait]
    impl CompetitorSource for FakeCompetitors {
        fn name(&self) -> &'static str { "fake-llama" }
        async fn fetch_competitors(&self) -> Result<CompetitorBoard, SourceError> {
            let mut board = CompetitorBoard::new();
            board.insert("orca".into(), CompetitorStats { name: "Orca".into(), tvl: 1e9, ..Default::default() });
            Ok(board)
        }
    }

    struct FakeSocial;

    #[async_trait]
    impl SocialSource for FakeSocial {
        async fn x_posts(&self) -> Result<Vec<serde_json::Value>, SourceError> {
            Err(SourceError::Cache("no cache".into()))
        }
        async fn reddit_posts(&self) -> Result<Vec<RedditPost>, SourceError> {
            Ok(vec![RedditPost { title: "Solana DEX wars".into(), score: 42, ..Default::default() }])
        }
        fn daily_report(&self, date: &str) -> String {
            format!("ops notes {date}")
        }
    }

    struct FakeNarrative;

    #[async_trait]
    impl NarrativeSource for FakeNarrative {
        async fn complete(&self, prompt: &str) -> Result<String, SourceError> {
            if prompt.contains("operations analyst") {
                Ok("internal take".into())
            } else {
                Err(SourceError::Status(529))
            }
        }
    }

    fn pool(address: &str, base: &str, quote: &str, tvl: f64, volume: f64) -> PoolRecord {
        PoolRecord {
            address: address.into(),
            name: PoolRecord::display_name(base, quote),
            base_symbol: base.into(),
            quote_symbol: quote.into(),
            tvl,
            volume_24h: volume,
            fee_24h: volume * 0.003,
            ..Default::default()
        }
    }

    fn listing(records: Vec<PoolRecord>) -> PoolListing {
        let total = records.len() as u64 + 2;
        PoolListing { records, total, raw_pages: vec![serde_json::json!({"retCode": 0})] }
    }

    fn collector(dir: &TempDir, pools: Result<PoolListing, ()>, market_fails: bool) -> DailyCollector {
        let mut config = Config::default();
        config.storage.data_dir = dir.path().display().to_string();
        let sources = Sources {
            pools: Arc::new(FakePools(Mutex::new(pools))),
            market: Arc::new(FakeMarket { fail: market_fails }),
            competitors: Arc::new(FakeCompetitors),
            social: Arc::new(FakeSocial),
            narrative: Arc::new(FakeNarrative),
        };
        DailyCollector::new(&config, sources)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 9, 0, 0).unwrap()
    }

    fn day_one_pools() -> Vec<PoolRecord> {
        vec![
            pool("sol-usdc", "SOL", "USDC", 10_600_000.0, 2_000_000.0),
            pool("tsla", "TSLAx", "USDC", 50_000.0, 1_000.0),
            pool("stable", "USDC", "USDT", 1_000.0, 0.0),
        ]
    }

    #[tokio::test]
    async fn run_publishes_a_complete_document() {
        let dir = tempfile::tempdir().unwrap();
        let c = collector(&dir, Ok(listing(day_one_pools())), false);

        let summary = c.run(day(1), at(1), false).await.unwrap();
        assert_eq!(summary.date, "2025-03-01");
        assert_eq!(summary.pools, 3);

        let raw = std::fs::read_to_string(summary.path.join("summary.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        for key in [
            "date", "ts", "platform", "bizLines", "rankings", "xStocks", "pools", "market", "competitors",
            "alerts", "aiInsight", "aiPublic", "dailyReport", "xTrends", "redditHot",
        ] {
            assert!(doc.get(key).is_some(), "missing {key}");
        }
        assert_eq!(doc["ts"], "2025-03-01T09:00:00Z");
        assert_eq!(doc["platform"]["total"], 5);
        assert_eq!(doc["platform"]["active"], 2);
        assert!(doc["platform"].get("tvlChange").is_none());
        assert_eq!(doc["bizLines"]["xStocks"]["count"], 1);
        assert_eq!(doc["bizLines"]["Gold_RWA"]["count"], 0);
        assert_eq!(doc["rankings"]["topTvl"][0]["addr"], "sol-usdc");
        assert_eq!(doc["xStocks"][0]["addr"], "tsla");
        assert_eq!(doc["competitors"]["byreal"]["name"], "Byreal");
        assert_eq!(doc["competitors"]["orca"]["name"], "Orca");
        assert_eq!(doc["aiInsight"], "internal take");
        assert_eq!(doc["aiPublic"], "");
        assert_eq!(doc["dailyReport"], "ops notes 2025-03-01");
        assert_eq!(doc["xTrends"], serde_json::json!([]));
        assert_eq!(doc["redditHot"][0]["score"], 42);

        // SOL +12.3% is the only alert on a first run
        assert_eq!(summary.alerts.len(), 1);
        assert_eq!(summary.alerts[0].category, AlertCategory::Market);

        let stored = c.store().load_latest().unwrap().unwrap();
        assert_eq!(stored.pools[1].business_line, BusinessLine::TokenizedEquity);
    }

    #[tokio::test]
    async fn secondary_failures_degrade() {
        let dir = tempfile::tempdir().unwrap();
        let c = collector(&dir, Ok(listing(day_one_pools())), true);

        let summary = c.run(day(1), at(1), false).await.unwrap();
        assert!(summary.alerts.is_empty());

        let stored = c.store().load("2025-03-01").unwrap().unwrap();
        assert!(stored.market.assets.is_empty());
        assert!(stored.market.sentiment.is_none());
    }

    #[tokio::test]
    async fn primary_failure_aborts_without_publishing() {
        let dir = tempfile::tempdir().unwrap();
        let c = collector(&dir, Err(()), false);

        let err = c.run(day(1), at(1), false).await.unwrap_err();
        assert!(matches!(err, PipelineError::PrimarySource(SourceError::Status(503))));
        assert!(c.store().list_dates().unwrap().is_empty());
        assert!(c.store().latest_date().unwrap().is_none());
    }

    #[tokio::test]
    async fn published_date_requires_force() {
        let dir = tempfile::tempdir().unwrap();
        let c = collector(&dir, Ok(listing(day_one_pools())), false);
        c.run(day(1), at(1), false).await.unwrap();

        let err = c.run(day(1), at(1), false).await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::AlreadyPublished(_))));

        c.run(day(1), at(1), true).await.unwrap();
    }

    #[tokio::test]
    async fn second_day_compares_with_the_first() {
        let dir = tempfile::tempdir().unwrap();
        collector(&dir, Ok(listing(day_one_pools())), true)
            .run(day(1), at(1), false)
            .await
            .unwrap();

        let mut today = day_one_pools();
        today[0].tvl = 10_000_000.0 - 51_000.0;
        today.push(pool("jup-sol", "JUP", "SOL", 1_000.0, 10.0));
        let c = collector(&dir, Ok(listing(today)), true);

        let summary = c.run(day(2), at(2), false).await.unwrap();
        let categories: Vec<AlertCategory> = summary.alerts.iter().map(|a| a.category).collect();
        assert_eq!(categories, [AlertCategory::Platform, AlertCategory::NewPool]);
        assert!(summary.alerts[1].message.contains("JUP-SOL"));

        let stored = c.store().load_latest().unwrap().unwrap();
        assert_eq!(stored.date, "2025-03-02");
        let tvl_change = stored.platform.tvl_change.unwrap();
        assert!(tvl_change < -0.05);
        assert!(stored.platform.volume_change.is_some());
    }
}
