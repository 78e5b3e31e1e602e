use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub alerts: AlertThresholds,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub social: SocialConfig,
    #[serde(default)]
    pub narrative: NarrativeConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_pools_url")]
    pub pools_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_coingecko_url")]
    pub coingecko_url: String,
    #[serde(default = "default_fear_greed_url")]
    pub fear_greed_url: String,
    #[serde(default = "default_defillama_url")]
    pub defillama_url: String,
    #[serde(default = "default_reference_assets")]
    pub reference_assets: Vec<ReferenceAsset>,
    #[serde(default = "default_competitors")]
    pub competitors: Vec<String>,
    /// Slug and display name the platform itself is listed under among competitors.
    #[serde(default = "default_platform_slug")]
    pub platform_slug: String,
    #[serde(default = "default_platform_name")]
    pub platform_name: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReferenceAsset {
    /// Key in the market block of the summary (`sol`, `btc`, ...)
    pub key: String,
    /// CoinGecko coin id (`solana`, `bitcoin`, ...)
    pub coingecko_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout for the primary pool listing, which returns a large page
    #[serde(default = "default_pools_timeout_secs")]
    pub pools_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Pause between successive calls to the same rate-limited API
    #[serde(default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_equity_category")]
    pub tokenized_equity_category: i64,
    #[serde(default = "default_equity_suffix")]
    pub tokenized_equity_suffix: char,
    #[serde(default = "default_equity_min_len")]
    pub tokenized_equity_min_len: usize,
    #[serde(default = "default_gold_keywords")]
    pub gold_keywords: Vec<String>,
    #[serde(default = "default_stable_symbols")]
    pub stable_symbols: Vec<String>,
    #[serde(default = "default_major_symbols")]
    pub major_symbols: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Pools at or below this TVL are excluded from the yield views
    #[serde(default = "default_tvl_floor")]
    pub tvl_floor: f64,
    /// Share of 24h fees retained by the protocol
    #[serde(default = "default_protocol_fee_share")]
    pub protocol_fee_share: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AlertThresholds {
    /// Reference asset whose move triggers the market alert (key in the market block)
    #[serde(default = "default_reference_key")]
    pub reference_asset: String,
    /// In percent, as reported by the price source
    #[serde(default = "default_market_move_pct")]
    pub market_move_pct: f64,
    #[serde(default = "default_extreme_fear")]
    pub extreme_fear: u8,
    #[serde(default = "default_extreme_greed")]
    pub extreme_greed: u8,
    /// Fraction, e.g. 0.05 = 5%
    #[serde(default = "default_equity_move")]
    pub tokenized_equity_move: f64,
    #[serde(default = "default_high_apr")]
    pub high_apr: f64,
    #[serde(default = "default_high_apr_min_tvl")]
    pub high_apr_min_tvl: f64,
    #[serde(default = "default_expiry_window_days")]
    pub incentive_expiry_days: f64,
    /// Fraction, negative, e.g. -0.05
    #[serde(default = "default_tvl_drop")]
    pub tvl_drop: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SocialConfig {
    #[serde(default = "default_x_cache")]
    pub x_cache_path: String,
    #[serde(default = "default_subreddits")]
    pub subreddits: Vec<String>,
    #[serde(default = "default_reddit_keywords")]
    pub relevance_keywords: Vec<String>,
    #[serde(default = "default_reddit_limit")]
    pub posts_per_subreddit: u32,
    /// Candidate locations of the daily ops report, `{date}` is substituted
    #[serde(default)]
    pub daily_report_paths: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NarrativeConfig {
    #[serde(default = "default_anthropic_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_narrative_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifyConfig {
    #[serde(default)]
    pub lark_webhook: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_pools_url() -> String {
    "https://api2.byreal.io/byreal/api/dex/v2/pools/info/list".to_string()
}
fn default_page_size() -> u32 { 500 }
fn default_max_pages() -> u32 { 1 }
fn default_coingecko_url() -> String { "https://api.coingecko.com/api/v3/simple/price".to_string() }
fn default_fear_greed_url() -> String { "https://api.alternative.me/fng/?limit=1".to_string() }
fn default_defillama_url() -> String { "https://api.llama.fi".to_string() }
fn default_reference_assets() -> Vec<ReferenceAsset> {
    [("sol", "solana"), ("btc", "bitcoin"), ("eth", "ethereum")]
        .into_iter()
        .map(|(key, id)| ReferenceAsset { key: key.to_string(), coingecko_id: id.to_string() })
        .collect()
}
fn default_competitors() -> Vec<String> {
    ["raydium", "meteora", "orca", "pumpswap"].iter().map(|s| s.to_string()).collect()
}
fn default_platform_slug() -> String { "byreal".to_string() }
fn default_platform_name() -> String { "Byreal".to_string() }

fn default_timeout_secs() -> u64 { 30 }
fn default_pools_timeout_secs() -> u64 { 60 }
fn default_retries() -> u32 { 2 }
fn default_retry_delay_ms() -> u64 { 2000 }
fn default_politeness_delay_ms() -> u64 { 500 }
fn default_user_agent() -> String { "Byreal-Dashboard/1.0".to_string() }

fn default_equity_category() -> i64 { 32 }
fn default_equity_suffix() -> char { 'x' }
fn default_equity_min_len() -> usize { 3 }
fn default_gold_keywords() -> Vec<String> { vec!["XAUt".to_string()] }
fn default_stable_symbols() -> Vec<String> {
    ["USDC", "USDT", "USD1", "DAI"].iter().map(|s| s.to_string()).collect()
}
fn default_major_symbols() -> Vec<String> {
    ["SOL", "WETH", "WBTC", "BTC", "ETH", "Wrapped SOL", "Wrapped Ether"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_top_n() -> usize { 15 }
fn default_tvl_floor() -> f64 { 500.0 }
fn default_protocol_fee_share() -> f64 { 0.12 }

fn default_reference_key() -> String { "sol".to_string() }
fn default_market_move_pct() -> f64 { 10.0 }
fn default_extreme_fear() -> u8 { 20 }
fn default_extreme_greed() -> u8 { 80 }
fn default_equity_move() -> f64 { 0.05 }
fn default_high_apr() -> f64 { 5.0 }
fn default_high_apr_min_tvl() -> f64 { 1000.0 }
fn default_expiry_window_days() -> f64 { 7.0 }
fn default_tvl_drop() -> f64 { -0.05 }

fn default_data_dir() -> String { "./data".to_string() }

fn default_x_cache() -> String { "./data/x_cache.json".to_string() }
fn default_subreddits() -> Vec<String> {
    ["solana", "defi", "cryptocurrency"].iter().map(|s| s.to_string()).collect()
}
fn default_reddit_keywords() -> Vec<String> {
    ["byreal", "solana", "dex"].iter().map(|s| s.to_string()).collect()
}
fn default_reddit_limit() -> u32 { 5 }

fn default_anthropic_url() -> String { "https://api.anthropic.com/v1/messages".to_string() }
fn default_model() -> String { "claude-sonnet-4-20250514".to_string() }
fn default_max_tokens() -> u32 { 1000 }
fn default_narrative_timeout() -> u64 { 60 }

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            pools_url: default_pools_url(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            coingecko_url: default_coingecko_url(),
            fear_greed_url: default_fear_greed_url(),
            defillama_url: default_defillama_url(),
            reference_assets: default_reference_assets(),
            competitors: default_competitors(),
            platform_slug: default_platform_slug(),
            platform_name: default_platform_name(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            pools_timeout_secs: default_pools_timeout_secs(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            politeness_delay_ms: default_politeness_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            tokenized_equity_category: default_equity_category(),
            tokenized_equity_suffix: default_equity_suffix(),
            tokenized_equity_min_len: default_equity_min_len(),
            gold_keywords: default_gold_keywords(),
            stable_symbols: default_stable_symbols(),
            major_symbols: default_major_symbols(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            tvl_floor: default_tvl_floor(),
            protocol_fee_share: default_protocol_fee_share(),
        }
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            reference_asset: default_reference_key(),
            market_move_pct: default_market_move_pct(),
            extreme_fear: default_extreme_fear(),
            extreme_greed: default_extreme_greed(),
            tokenized_equity_move: default_equity_move(),
            high_apr: default_high_apr(),
            high_apr_min_tvl: default_high_apr_min_tvl(),
            incentive_expiry_days: default_expiry_window_days(),
            tvl_drop: default_tvl_drop(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            x_cache_path: default_x_cache(),
            subreddits: default_subreddits(),
            relevance_keywords: default_reddit_keywords(),
            posts_per_subreddit: default_reddit_limit(),
            daily_report_paths: Vec::new(),
        }
    }
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            api_url: default_anthropic_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_narrative_timeout(),
            api_key: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Config {
    /// Reads `path` if it exists, otherwise starts from the built-in defaults.
    /// Secrets are always taken from the environment when set.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let mut config: Config = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config {} not found, using defaults", path.display());
            Config::default()
        };

        if let Some(key) = non_empty_env("ANTHROPIC_API_KEY") {
            config.narrative.api_key = Some(key);
        }
        if let Some(hook) = non_empty_env("LARK_WEBHOOK") {
            config.notify.lark_webhook = Some(hook);
        }

        Ok(config)
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_production_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.ranking.top_n, 15);
        assert_eq!(config.ranking.tvl_floor, 500.0);
        assert_eq!(config.ranking.protocol_fee_share, 0.12);
        assert_eq!(config.classifier.tokenized_equity_category, 32);
        assert_eq!(config.alerts, AlertThresholds::default());
        assert_eq!(config.sources.reference_assets.len(), 3);
        assert_eq!(config.http.retries, 2);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [alerts]
            market_move_pct = 8.0

            [storage]
            data_dir = "/var/lib/dashboard"
            "#,
        )
        .unwrap();
        assert_eq!(config.alerts.market_move_pct, 8.0);
        assert_eq!(config.alerts.extreme_fear, 20);
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/dashboard"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.sources.page_size, 500);
    }
}
