use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;

use crate::config::NarrativeConfig;
use crate::models::{Alert, BusinessLineBoard, CompetitorBoard, MarketIndicators, PlatformTotals, PoolRecord};
use crate::services::aggregator::tvl_share;
use super::{NarrativeSource, SourceError};

/// Anthropic Messages API client. Without an API key every completion is empty.
pub struct AnthropicNarrative {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ContentBlock {
    text: String,
}

impl AnthropicNarrative {
    pub fn new(config: &NarrativeConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| SourceError::Network(e.to_string()))?,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl NarrativeSource for AnthropicNarrative {
    async fn complete(&self, prompt: &str) -> Result<String, SourceError> {
        let Some(key) = &self.api_key else {
            return Ok(String::new());
        };

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [Message { role: "user", content: prompt }],
        };

        let resp = self.client.post(&self.api_url)
            .header("x-api-key", key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let body: MessagesResponse = resp.json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        Ok(body.content.into_iter().next().map(|b| b.text).unwrap_or_default())
    }
}

/// Everything the narrative digest is built from.
pub struct DigestInputs<'a> {
    pub date: &'a str,
    pub platform_name: &'a str,
    pub platform: &'a PlatformTotals,
    pub biz_lines: &'a BusinessLineBoard,
    pub market: &'a MarketIndicators,
    pub reference_asset: &'a str,
    pub competitors: &'a CompetitorBoard,
    pub alerts: &'a [Alert],
    pub tokenized_equity: &'a [&'a PoolRecord],
}

fn change_or_na(change: Option<f64>) -> String {
    change.map(|c| format!("{:+.1}%", c * 100.0)).unwrap_or_else(|| "N/A".to_string())
}

/// Plain-text digest of the day, shared by both prompts.
pub fn build_digest(inputs: &DigestInputs<'_>) -> String {
    let p = inputs.platform;
    let mut out = String::new();

    let _ = writeln!(out, "{} platform data ({}):", inputs.platform_name, inputs.date);
    let _ = writeln!(
        out,
        "- TVL: ${:.2}M | 24h Vol: ${:.2}M | 24h Fee: ${:.0}",
        p.tvl / 1e6, p.volume_24h / 1e6, p.fee_24h
    );
    let _ = writeln!(out, "- Active pools: {}/{}", p.active_pools, p.total_pools);
    let _ = writeln!(
        out,
        "- TVL day change: {} | Vol day change: {}",
        change_or_na(p.tvl_change),
        change_or_na(p.volume_change)
    );

    let _ = writeln!(out, "\nBusiness lines:");
    for (line, agg) in inputs.biz_lines {
        let _ = writeln!(
            out,
            "  {}: TVL ${:.2}M ({:.0}%) | Vol ${:.2}M",
            line,
            agg.tvl / 1e6,
            tvl_share(agg.tvl, p.tvl),
            agg.volume_24h / 1e6
        );
    }

    let _ = writeln!(out, "\nMarket:");
    let reference = inputs.market.quote(inputs.reference_asset).cloned().unwrap_or_default();
    let _ = writeln!(
        out,
        "- {}: ${:.2} ({:+.1}%)",
        inputs.reference_asset.to_uppercase(),
        reference.price,
        reference.change_24h
    );
    match &inputs.market.sentiment {
        Some(s) => { let _ = writeln!(out, "- Fear & Greed: {} ({})", s.value, s.label); }
        None => { let _ = writeln!(out, "- Fear & Greed: ?"); }
    }

    let _ = writeln!(out, "\nCompetitor TVL:");
    let mut competitors: Vec<_> = inputs.competitors.iter().collect();
    competitors.sort_by(|a, b| b.1.tvl.total_cmp(&a.1.tvl));
    for (_, c) in competitors {
        let _ = writeln!(out, "  {}: TVL ${:.1}M | Vol ${:.1}M", c.name, c.tvl / 1e6, c.volume_24h / 1e6);
    }

    let _ = writeln!(out, "\nAlerts:");
    for alert in inputs.alerts {
        let _ = writeln!(out, "  [{}] {}", alert.category.as_str(), alert.message);
    }

    if !inputs.tokenized_equity.is_empty() {
        let _ = writeln!(out, "\nxStocks:");
        for s in inputs.tokenized_equity.iter().take(8) {
            let _ = writeln!(
                out,
                "  {}: ${:.2} ({:+.1}%) TVL ${:.2}M",
                s.name,
                s.price,
                s.price_change_24h * 100.0,
                s.tvl / 1e6
            );
        }
    }

    out
}

pub fn insight_prompt(digest: &str, platform_name: &str) -> String {
    format!(
        "{digest}\nYou are an operations analyst at {platform_name}, a Solana-native DEX. Based on the data above, \
         write a short operations insight (3-5 sentences) covering:\n\
         1. An overall judgement of today's platform performance\n\
         2. The one or two opportunities or risks most worth attention\n\
         3. Concrete operational actions\n\n\
         Be direct, opinionated and actionable. No pleasantries."
    )
}

pub fn public_prompt(digest: &str, platform_name: &str) -> String {
    format!(
        "{digest}\nYou run content for {platform_name}, a Solana-native DEX. Based on the data above, \
         write a short user-facing platform bulletin (3-4 sentences) covering:\n\
         1. Headline platform numbers\n\
         2. Trending pools or xStocks opportunities\n\
         3. Positive points suitable for a tweet or community post\n\n\
         Keep it upbeat and professional and highlight strengths. Do not mention risk alerts."
    )
}
