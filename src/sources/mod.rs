pub mod byreal;
pub mod defillama;
pub mod market;
pub mod narrative;
pub mod social;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::config::HttpConfig;
use crate::models::{AssetQuote, CompetitorBoard, PoolRecord, RedditPost, SentimentIndex};
use std::collections::BTreeMap;

/// One run's worth of pool listing data.
#[derive(Debug, Clone, Default)]
pub struct PoolListing {
    /// Records in source order, not yet classified
    pub records: Vec<PoolRecord>,
    /// Pool count from the listing's pagination metadata
    pub total: u64,
    /// Listing pages exactly as received, archived next to the summary
    pub raw_pages: Vec<serde_json::Value>,
}

/// Primary data: failure here aborts the run.
#[async_trait]
pub trait PoolSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_pools(&self) -> Result<PoolListing, SourceError>;
}

#[async_trait]
pub trait MarketSource: Send + Sync {
    fn name(&self) -> &'static str;
    /// Spot quotes keyed by reference asset
    async fn fetch_quotes(&self) -> Result<BTreeMap<String, AssetQuote>, SourceError>;
    async fn fetch_sentiment(&self) -> Result<SentimentIndex, SourceError>;
}

#[async_trait]
pub trait CompetitorSource: Send + Sync {
    fn name(&self) -> &'static str;
    /// Per-protocol gaps are filled with zeroes by the implementation.
    async fn fetch_competitors(&self) -> Result<CompetitorBoard, SourceError>;
}

#[async_trait]
pub trait SocialSource: Send + Sync {
    /// Pre-fetched X posts, passed through verbatim
    async fn x_posts(&self) -> Result<Vec<serde_json::Value>, SourceError>;
    async fn reddit_posts(&self) -> Result<Vec<RedditPost>, SourceError>;
    /// Today's free-text ops report, empty when none was written
    fn daily_report(&self, date: &str) -> String;
}

#[async_trait]
pub trait NarrativeSource: Send + Sync {
    /// Returns an empty string when no credentials are configured.
    async fn complete(&self, prompt: &str) -> Result<String, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Rate limited")]
    RateLimit,
    #[error("Rejected by source: {0}")]
    Rejected(String),
    #[error("Cache error: {0}")]
    Cache(String),
}

/// JSON-over-HTTP client with a per-call timeout and fixed-delay retry.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig, timeout_secs: u64) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            retries: config.retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url` and decode the body, retrying any failure up to the configured count.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let mut attempt = 0;
        loop {
            match self.try_get_json(url).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!("    retry {}/{} {}: {}", attempt, self.retries, url, e);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    tracing::error!("    ✗ {}: {}", url, e);
                    return Err(e);
                }
            }
        }
    }

    async fn try_get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let resp = self.client.get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if resp.status() == 429 {
            return Err(SourceError::RateLimit);
        }

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        resp.json::<T>()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

/// Lenient numeric read: numbers and numeric strings are accepted, null or
/// absent reads as zero. A malformed value also reads as zero but is logged
/// against `context` so the offending record can be found.
pub fn lenient_f64(value: Option<&serde_json::Value>, field: &str, context: &str) -> f64 {
    match value {
        None | Some(serde_json::Value::Null) => 0.0,
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => 0.0,
        Some(serde_json::Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                tracing::warn!("Malformed {} {:?} on {}, using 0", field, s, context);
                0.0
            }
        },
        Some(other) => {
            tracing::warn!("Malformed {} {} on {}, using 0", field, other, context);
            0.0
        }
    }
}
