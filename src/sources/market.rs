use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::config::{HttpConfig, ReferenceAsset, SourcesConfig};
use crate::models::{AssetQuote, SentimentIndex};
use super::{lenient_f64, HttpFetcher, MarketSource, SourceError};

/// CoinGecko spot prices plus the alternative.me fear & greed index.
pub struct CoinGeckoMarket {
    http: HttpFetcher,
    price_url: String,
    fear_greed_url: String,
    assets: Vec<ReferenceAsset>,
}

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    #[serde(default)]
    data: Vec<FearGreedEntry>,
}

#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: serde_json::Value,
    #[serde(default)]
    value_classification: String,
}

type SimplePrice = HashMap<String, HashMap<String, Option<f64>>>;

impl CoinGeckoMarket {
    pub fn new(sources: &SourcesConfig, http: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpFetcher::new(http, http.timeout_secs)?,
            price_url: sources.coingecko_url.clone(),
            fear_greed_url: sources.fear_greed_url.clone(),
            assets: sources.reference_assets.clone(),
        })
    }

    fn simple_price_url(&self) -> String {
        let ids: Vec<&str> = self.assets.iter().map(|a| a.coingecko_id.as_str()).collect();
        format!(
            "{}?ids={}&vs_currencies=usd&include_24hr_change=true&include_24hr_vol=true&include_market_cap=true",
            self.price_url,
            ids.join(",")
        )
    }
}

/// Map a CoinGecko simple-price payload onto the configured reference keys.
/// Assets absent from the payload get a zero quote.
fn quotes_from(payload: &SimplePrice, assets: &[ReferenceAsset]) -> BTreeMap<String, AssetQuote> {
    assets.iter()
        .map(|asset| {
            let coin = payload.get(&asset.coingecko_id);
            let field = |name: &str| coin.and_then(|c| c.get(name).copied().flatten());
            let quote = AssetQuote {
                price: field("usd").unwrap_or(0.0),
                change_24h: field("usd_24h_change").unwrap_or(0.0),
                mcap: field("usd_market_cap"),
            };
            (asset.key.clone(), quote)
        })
        .collect()
}

fn sentiment_from(response: FearGreedResponse) -> Result<SentimentIndex, SourceError> {
    let entry = response.data.into_iter()
        .next()
        .ok_or_else(|| SourceError::Parse("empty fear & greed data".to_string()))?;

    let value = lenient_f64(Some(&entry.value), "fng.value", "fear & greed").clamp(0.0, 100.0);

    Ok(SentimentIndex {
        value: value.round() as u8,
        label: entry.value_classification,
    })
}

#[async_trait]
impl MarketSource for CoinGeckoMarket {
    fn name(&self) -> &'static str {
        "CoinGecko"
    }

    async fn fetch_quotes(&self) -> Result<BTreeMap<String, AssetQuote>, SourceError> {
        let payload: SimplePrice = self.http.get_json(&self.simple_price_url()).await?;
        Ok(quotes_from(&payload, &self.assets))
    }

    async fn fetch_sentiment(&self) -> Result<SentimentIndex, SourceError> {
        let response: FearGreedResponse = self.http.get_json(&self.fear_greed_url).await?;
        sentiment_from(response)
    }
}
