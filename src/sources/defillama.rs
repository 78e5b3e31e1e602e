use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::{HttpConfig, SourcesConfig};
use crate::models::{CompetitorBoard, CompetitorStats};
use super::{lenient_f64, CompetitorSource, HttpFetcher, SourceError};

/// Competitor TVL and DEX volume from DefiLlama.
pub struct DefiLlama {
    http: HttpFetcher,
    base_url: String,
    slugs: Vec<String>,
    delay: Duration,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ProtocolResponse {
    name: Option<String>,
    #[serde(rename = "currentChainTvls")]
    current_chain_tvls: HashMap<String, Value>,
    tvl: Vec<TvlPoint>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TvlPoint {
    #[serde(rename = "totalLiquidityUSD")]
    total_liquidity_usd: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DexSummary {
    total24h: Option<Value>,
    total7d: Option<Value>,
}

/// Solana-chain TVL, falling back to the last point of the TVL series.
fn protocol_tvl(slug: &str, resp: &ProtocolResponse) -> f64 {
    let chain = lenient_f64(resp.current_chain_tvls.get("Solana"), "currentChainTvls.Solana", slug);
    if chain != 0.0 {
        return chain;
    }
    resp.tvl.last()
        .map(|p| lenient_f64(p.total_liquidity_usd.as_ref(), "tvl.totalLiquidityUSD", slug))
        .unwrap_or(0.0)
}

impl DefiLlama {
    pub fn new(sources: &SourcesConfig, http: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpFetcher::new(http, http.timeout_secs)?,
            base_url: sources.defillama_url.trim_end_matches('/').to_string(),
            slugs: sources.competitors.clone(),
            delay: Duration::from_millis(http.politeness_delay_ms),
        })
    }

    async fn fetch_one(&self, slug: &str) -> CompetitorStats {
        let mut stats = CompetitorStats { name: slug.to_string(), ..Default::default() };

        let url = format!("{}/protocol/{}", self.base_url, slug);
        match self.http.get_json::<ProtocolResponse>(&url).await {
            Ok(resp) => {
                stats.tvl = protocol_tvl(slug, &resp);
                if let Some(name) = resp.name.filter(|n| !n.is_empty()) {
                    stats.name = name;
                }
            }
            Err(e) => tracing::warn!("  ✗ {} TVL unavailable: {}", slug, e),
        }
        tokio::time::sleep(self.delay).await;

        let url = format!("{}/summary/dexs/{}", self.base_url, slug);
        match self.http.get_json::<DexSummary>(&url).await {
            Ok(summary) => {
                stats.volume_24h = lenient_f64(summary.total24h.as_ref(), "total24h", slug);
                stats.volume_7d = lenient_f64(summary.total7d.as_ref(), "total7d", slug);
            }
            Err(e) => tracing::warn!("  ✗ {} volume unavailable: {}", slug, e),
        }
        tokio::time::sleep(self.delay).await;

        stats
    }
}

#[async_trait]
impl CompetitorSource for DefiLlama {
    fn name(&self) -> &'static str {
        "DefiLlama"
    }

    async fn fetch_competitors(&self) -> Result<CompetitorBoard, SourceError> {
        let mut board = CompetitorBoard::new();
        for slug in &self.slugs {
            let stats = self.fetch_one(slug).await;
            board.insert(slug.clone(), stats);
        }
        Ok(board)
    }
}
