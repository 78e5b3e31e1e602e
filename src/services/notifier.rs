//! Lark (Feishu) webhook push of the published daily snapshot.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;
use thiserror::Error;

use crate::models::{BusinessLine, StoredSnapshot};
use super::aggregator::tvl_share;

const PUSH_TIMEOUT_SECS: u64 = 15;
/// Order business lines appear in the push
const LINE_ORDER: [BusinessLine; 5] = [
    BusinessLine::TokenizedEquity,
    BusinessLine::GoldRwa,
    BusinessLine::Major,
    BusinessLine::Other,
    BusinessLine::Stablecoin,
];

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Lark request failed: {0}")]
    Network(String),
    #[error("Lark returned HTTP {0}: {1}")]
    Status(u16, String),
    #[error("Lark rejected the message: {0}")]
    Rejected(String),
}

#[derive(Serialize)]
struct LarkMessage<'a> {
    msg_type: &'a str,
    content: LarkContent<'a>,
}

#[derive(Serialize)]
struct LarkContent<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LarkResponse {
    code: Option<i64>,
    #[serde(rename = "StatusCode")]
    status_code: Option<i64>,
    msg: Option<String>,
}

pub struct LarkNotifier {
    client: Client,
    webhook_url: String,
}

impl LarkNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(PUSH_TIMEOUT_SECS))
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;
        Ok(Self { client, webhook_url: webhook_url.into() })
    }

    /// Send a plain text message.
    pub async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        let message = LarkMessage { msg_type: "text", content: LarkContent { text } };

        let resp = self.client.post(&self.webhook_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("Lark push failed: {} - {}", status, body);
            return Err(NotifyError::Status(status.as_u16(), body));
        }

        let body: LarkResponse = resp.json().await.unwrap_or_default();
        if body.code == Some(0) || body.status_code == Some(0) {
            tracing::debug!("Lark notification sent");
            Ok(())
        } else {
            Err(NotifyError::Rejected(body.msg.unwrap_or_else(|| "unknown response".to_string())))
        }
    }
}

/// `$1.23B`, `$4.56M`, `$7.8K`, `$12`.
pub fn fmt_usd(value: f64) -> String {
    if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("${:.1}K", value / 1e3)
    } else {
        format!("${:.0}", value)
    }
}

/// Day-over-day fraction as an arrow and percent, e.g. `▼ 5.7%`.
pub fn fmt_change(change: f64) -> String {
    let arrow = if change >= 0.0 { '▲' } else { '▼' };
    format!("{} {:.1}%", arrow, change.abs() * 100.0)
}

fn group_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0.0 {
        out.insert(0, '-');
    }
    out
}

fn fmt_price(price: f64) -> String {
    if price >= 1000.0 {
        format!("${}", group_thousands(price))
    } else {
        format!("${:.2}", price)
    }
}

/// Render the snapshot as the daily chat digest.
pub fn build_message(snapshot: &StoredSnapshot, platform_name: &str, platform_slug: &str) -> String {
    let p = &snapshot.platform;
    let mut out = String::new();

    let with_change = |value: f64, change: Option<f64>| match change {
        Some(c) => format!("{}  {}", fmt_usd(value), fmt_change(c)),
        None => fmt_usd(value),
    };

    let _ = writeln!(out, "📊 {} Dashboard — {}", platform_name, snapshot.date);
    let _ = writeln!(out, "\n━━━━ Platform ━━━━");
    let _ = writeln!(out, "TVL: {}", with_change(p.tvl, p.tvl_change));
    let _ = writeln!(out, "24h Volume: {}", with_change(p.volume_24h, p.volume_change));
    let _ = writeln!(out, "24h Fees: {}", fmt_usd(p.fee_24h));
    let _ = writeln!(out, "24h Protocol Revenue: {}", fmt_usd(p.revenue_24h));
    let _ = writeln!(out, "Active/Total pools: {}/{}", p.active_pools, p.total_pools);

    let lines: Vec<_> = LINE_ORDER.iter()
        .filter_map(|line| snapshot.biz_lines.get(line).map(|agg| (line, agg)))
        .filter(|(_, agg)| agg.tvl > 0.0)
        .collect();
    if !lines.is_empty() {
        let _ = writeln!(out, "\n━━━━ Business lines ━━━━");
        for (line, agg) in lines {
            let _ = writeln!(
                out,
                "  {}: TVL {} ({:.1}%) | Vol {} | {} pools",
                line,
                fmt_usd(agg.tvl),
                tvl_share(agg.tvl, p.tvl),
                fmt_usd(agg.volume_24h),
                agg.count
            );
        }
    }

    if !snapshot.tokenized_equity.is_empty() {
        let _ = writeln!(out, "\n━━━━ xStocks ━━━━");
        for s in snapshot.tokenized_equity.iter().take(8) {
            let change = if s.price_change_24h != 0.0 {
                format!(" {}", fmt_change(s.price_change_24h).replace(' ', ""))
            } else {
                String::new()
            };
            let _ = writeln!(
                out,
                "  {}: TVL {} | Vol {} | ${:.2}{}",
                s.name,
                fmt_usd(s.tvl),
                fmt_usd(s.volume_24h),
                s.price,
                change
            );
        }
    }

    if !snapshot.competitors.is_empty() {
        let _ = writeln!(out, "\n━━━━ Competitors ━━━━");
        let mut competitors: Vec<_> = snapshot.competitors.iter().collect();
        competitors.sort_by(|a, b| b.1.tvl.total_cmp(&a.1.tvl));
        for (slug, c) in competitors {
            let marker = if slug == platform_slug { " ⭐" } else { "" };
            let volume = if c.volume_24h > 0.0 { fmt_usd(c.volume_24h) } else { "—".to_string() };
            let name = if c.name.is_empty() { slug.as_str() } else { c.name.as_str() };
            let _ = writeln!(out, "  {}: TVL {} | Vol24h {}{}", name, fmt_usd(c.tvl), volume, marker);
        }
    }

    if !snapshot.alerts.is_empty() {
        let _ = writeln!(out, "\n━━━━ ⚠️ Action items ━━━━");
        for alert in &snapshot.alerts {
            let _ = writeln!(out, "  {} {}", alert.severity.icon(), alert.message);
        }
    }

    let _ = writeln!(out, "\n━━━━ Market ━━━━");
    for (key, quote) in &snapshot.market.assets {
        let _ = writeln!(out, "{}: {} ({:+.1}%)", key.to_uppercase(), fmt_price(quote.price), quote.change_24h);
    }
    match &snapshot.market.sentiment {
        Some(s) => { let _ = write!(out, "Fear & Greed: {} ({})", s.value, s.label); }
        None => { let _ = write!(out, "Fear & Greed: ?"); }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Alert, AlertCategory, AssetQuote, BusinessLineAggregate, CompetitorStats, PlatformTotals, PoolRecord,
        SentimentIndex, Severity,
    };

    #[test]
    fn usd_scales() {
        assert_eq!(fmt_usd(2_345_000_000.0), "$2.35B");
        assert_eq!(fmt_usd(10_000_000.0), "$10.00M");
        assert_eq!(fmt_usd(1_500.0), "$1.5K");
        assert_eq!(fmt_usd(999.0), "$999");
        assert_eq!(fmt_usd(0.0), "$0");
    }

    #[test]
    fn change_arrows() {
        assert_eq!(fmt_change(-0.0566), "▼ 5.7%");
        assert_eq!(fmt_change(0.0), "▲ 0.0%");
        assert_eq!(fmt_change(0.123), "▲ 12.3%");
    }

    #[test]
    fn prices_group_thousands() {
        assert_eq!(fmt_price(97_123.4), "$97,123");
        assert_eq!(fmt_price(1_000.0), "$1,000");
        assert_eq!(fmt_price(150.256), "$150.26");
        assert_eq!(group_thousands(1_234_567.0), "1,234,567");
    }

    fn snapshot() -> StoredSnapshot {
        let mut s = StoredSnapshot {
            date: "2025-03-02".into(),
            platform: PlatformTotals {
                tvl: 10_000_000.0,
                volume_24h: 2_000_000.0,
                fee_24h: 6_000.0,
                revenue_24h: 720.0,
                active_pools: 40,
                total_pools: 55,
                tvl_change: Some(-0.0566),
                ..Default::default()
            },
            ..Default::default()
        };
        s.biz_lines.insert(
            BusinessLine::TokenizedEquity,
            BusinessLineAggregate { tvl: 2_500_000.0, volume_24h: 100_000.0, fee_24h: 0.0, count: 12 },
        );
        s.biz_lines.insert(BusinessLine::GoldRwa, BusinessLineAggregate::default());
        s.tokenized_equity.push(PoolRecord {
            name: "TSLAx-USDC".into(),
            tvl: 800_000.0,
            volume_24h: 50_000.0,
            price: 251.5,
            price_change_24h: -0.07,
            ..Default::default()
        });
        s.competitors.insert("orca".into(), CompetitorStats { name: "Orca".into(), tvl: 3e8, ..Default::default() });
        s.competitors.insert(
            "byreal".into(),
            CompetitorStats { name: "Byreal".into(), tvl: 1e7, volume_24h: 2e6, ..Default::default() },
        );
        s.alerts.push(Alert::new(Severity::Red, AlertCategory::Platform, "Platform TVL down 5.7%"));
        s.market.assets.insert("sol".into(), AssetQuote { price: 150.0, change_24h: 12.3, mcap: None });
        s.market.assets.insert("btc".into(), AssetQuote { price: 97_000.0, change_24h: -1.0, mcap: None });
        s.market.sentiment = Some(SentimentIndex { value: 72, label: "Greed".into() });
        s
    }

    #[test]
    fn message_covers_every_section() {
        let text = build_message(&snapshot(), "Byreal", "byreal");

        assert!(text.starts_with("📊 Byreal Dashboard — 2025-03-02"));
        assert!(text.contains("TVL: $10.00M  ▼ 5.7%"));
        assert!(text.contains("24h Volume: $2.00M\n"));
        assert!(text.contains("Active/Total pools: 40/55"));
        assert!(text.contains("xStocks: TVL $2.50M (25.0%) | Vol $100.0K | 12 pools"));
        assert!(!text.contains("Gold_RWA"));
        assert!(text.contains("TSLAx-USDC: TVL $800.0K | Vol $50.0K | $251.50 ▼7.0%"));
        assert!(text.contains("Byreal: TVL $10.00M | Vol24h $2.00M ⭐"));
        assert!(text.contains("Orca: TVL $300.00M | Vol24h —"));
        assert!(text.find("Orca").unwrap() < text.find("Byreal: TVL").unwrap());
        assert!(text.contains("🔴 Platform TVL down 5.7%"));
        assert!(text.contains("SOL: $150.00 (+12.3%)"));
        assert!(text.contains("BTC: $97,000 (-1.0%)"));
        assert!(text.ends_with("Fear & Greed: 72 (Greed)"));
    }

    #[test]
    fn sparse_snapshot_still_renders() {
        let text = build_message(&StoredSnapshot::default(), "Byreal", "byreal");
        assert!(text.contains("TVL: $0"));
        assert!(!text.contains("Action items"));
        assert!(text.ends_with("Fear & Greed: ?"));
    }
}
