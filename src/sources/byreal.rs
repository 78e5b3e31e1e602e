use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{HttpConfig, SourcesConfig};
use crate::models::{Incentive, PoolRecord};
use super::{lenient_f64, HttpFetcher, PoolListing, PoolSource, SourceError};

/// Pool listing API of the platform itself.
pub struct ByrealPools {
    http: HttpFetcher,
    base_url: String,
    page_size: u32,
    max_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ListingEnvelope {
    #[serde(rename = "retCode")]
    ret_code: Option<i64>,
    #[serde(rename = "retMsg")]
    ret_msg: Option<String>,
    result: Option<ListingResult>,
}

#[derive(Debug, Deserialize)]
struct ListingResult {
    data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    records: Vec<Value>,
    total: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawPool {
    #[serde(rename = "poolAddress")]
    pool_address: Option<String>,
    category: Option<Value>,
    #[serde(rename = "baseMint")]
    base_mint: Option<RawMint>,
    #[serde(rename = "quoteMint")]
    quote_mint: Option<RawMint>,
    tvl: Option<Value>,
    #[serde(rename = "volumeUsd1h")]
    volume_1h: Option<Value>,
    #[serde(rename = "volumeUsd24h")]
    volume_24h: Option<Value>,
    #[serde(rename = "volumeUsd7d")]
    volume_7d: Option<Value>,
    #[serde(rename = "feeUsd24h")]
    fee_24h: Option<Value>,
    #[serde(rename = "feeUsd7d")]
    fee_7d: Option<Value>,
    #[serde(rename = "feeApr24h")]
    fee_apr: Option<Value>,
    #[serde(rename = "feeTvl1d")]
    fee_to_tvl: Option<Value>,
    price: Option<Value>,
    #[serde(rename = "priceChange1h")]
    price_change_1h: Option<Value>,
    #[serde(rename = "priceChange1d")]
    price_change_24h: Option<Value>,
    #[serde(rename = "priceChange7d")]
    price_change_7d: Option<Value>,
    #[serde(rename = "totalBonus")]
    total_bonus: Option<Value>,
    rewards: Option<Vec<RawReward>>,
    kline7d: Option<Vec<Value>>,
    kline1d: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawMint {
    #[serde(rename = "mintInfo")]
    mint_info: Option<RawMintInfo>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawMintInfo {
    symbol: Option<String>,
    #[serde(rename = "logoURI")]
    logo_uri: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawReward {
    token: Option<RawMint>,
    apr: Option<Value>,
    #[serde(rename = "endTimestamp")]
    end_timestamp: Option<Value>,
    #[serde(rename = "dailyAmountDisplay")]
    daily_amount_display: Option<Value>,
    #[serde(rename = "dailyMaxAmount")]
    daily_max_amount: Option<Value>,
}

impl RawMint {
    fn info(&self) -> (String, String) {
        let info = self.mint_info.as_ref();
        (
            info.and_then(|i| i.symbol.clone()).unwrap_or_default(),
            info.and_then(|i| i.logo_uri.clone()).unwrap_or_default(),
        )
    }
}

/// Non-empty display form of a JSON scalar, used for source-formatted amounts.
fn display_amount(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Latest instant chrono can represent, 9999-12-31T23:59:59.999Z
const MAX_TIMESTAMP_MS: f64 = 253_402_300_799_999.0;

/// Millisecond timestamp, or 0 when the value is negative or past year 9999.
fn timestamp_ms(value: f64, ctx: &str) -> i64 {
    if (0.0..=MAX_TIMESTAMP_MS).contains(&value) {
        value as i64
    } else {
        tracing::warn!("    {}: reward.endTimestamp {} out of range, using 0", ctx, value);
        0
    }
}

impl RawPool {
    fn into_record(self) -> PoolRecord {
        let address = self.pool_address.clone().unwrap_or_default();
        let ctx = if address.is_empty() { "<no address>" } else { address.as_str() };
        let num = |v: &Option<Value>, field: &str| lenient_f64(v.as_ref(), field, ctx);

        let (base_symbol, base_logo) = self.base_mint.as_ref().map(RawMint::info).unwrap_or_default();
        let (quote_symbol, quote_logo) = self.quote_mint.as_ref().map(RawMint::info).unwrap_or_default();

        let incentive = self.rewards.as_ref().and_then(|r| r.first()).map(|r| Incentive {
            symbol: r.token.as_ref().map(|t| t.info().0).unwrap_or_default(),
            apr: lenient_f64(r.apr.as_ref(), "reward.apr", ctx),
            end_ts: timestamp_ms(lenient_f64(r.end_timestamp.as_ref(), "reward.endTimestamp", ctx), ctx),
            daily_amount: display_amount(r.daily_amount_display.as_ref())
                .or_else(|| display_amount(r.daily_max_amount.as_ref()))
                .unwrap_or_else(|| "0".to_string()),
        });

        let series = |v: &Option<Vec<Value>>, field: &str| -> Vec<f64> {
            v.iter().flatten().map(|x| lenient_f64(Some(x), field, ctx)).collect()
        };

        PoolRecord {
            name: PoolRecord::display_name(&base_symbol, &quote_symbol),
            category: num(&self.category, "category") as i64,
            business_line: Default::default(),
            tvl: num(&self.tvl, "tvl"),
            volume_1h: num(&self.volume_1h, "volumeUsd1h"),
            volume_24h: num(&self.volume_24h, "volumeUsd24h"),
            volume_7d: num(&self.volume_7d, "volumeUsd7d"),
            fee_24h: num(&self.fee_24h, "feeUsd24h"),
            fee_7d: num(&self.fee_7d, "feeUsd7d"),
            fee_apr: num(&self.fee_apr, "feeApr24h"),
            fee_to_tvl: num(&self.fee_to_tvl, "feeTvl1d"),
            price: num(&self.price, "price"),
            price_change_1h: num(&self.price_change_1h, "priceChange1h"),
            price_change_24h: num(&self.price_change_24h, "priceChange1d"),
            price_change_7d: num(&self.price_change_7d, "priceChange7d"),
            bonus: num(&self.total_bonus, "totalBonus"),
            incentive,
            kline7d: series(&self.kline7d, "kline7d"),
            kline1d: series(&self.kline1d, "kline1d"),
            address,
            base_symbol,
            quote_symbol,
            base_logo,
            quote_logo,
        }
    }
}

/// Decode one listing page into records and the pagination total.
///
/// A non-zero `retCode` or a missing data block rejects the page; individual
/// records that are not objects are skipped with a warning.
pub fn parse_listing_page(page: &Value) -> Result<(Vec<PoolRecord>, u64), SourceError> {
    let envelope: ListingEnvelope = serde_json::from_value(page.clone())
        .map_err(|e| SourceError::Parse(e.to_string()))?;

    if envelope.ret_code != Some(0) {
        return Err(SourceError::Rejected(format!(
            "retCode={:?} {}",
            envelope.ret_code,
            envelope.ret_msg.unwrap_or_default()
        )));
    }

    let data = envelope.result
        .and_then(|r| r.data)
        .ok_or_else(|| SourceError::Parse("missing result.data".to_string()))?;

    let total = lenient_f64(data.total.as_ref(), "total", "listing").max(0.0) as u64;

    let records = data.records.into_iter()
        .enumerate()
        .filter_map(|(i, raw)| match serde_json::from_value::<RawPool>(raw) {
            Ok(pool) => Some(pool.into_record()),
            Err(e) => {
                tracing::warn!("Skipping listing record #{}: {}", i, e);
                None
            }
        })
        .collect();

    Ok((records, total))
}

impl ByrealPools {
    pub fn new(sources: &SourcesConfig, http: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpFetcher::new(http, http.pools_timeout_secs)?,
            base_url: sources.pools_url.clone(),
            page_size: sources.page_size,
            max_pages: sources.max_pages.max(1),
        })
    }

    fn page_url(&self, page: u32) -> String {
        format!("{}?page={}&pageSize={}", self.base_url, page, self.page_size)
    }
}

#[async_trait]
impl PoolSource for ByrealPools {
    fn name(&self) -> &'static str {
        "Byreal"
    }

    async fn fetch_pools(&self) -> Result<PoolListing, SourceError> {
        let mut listing = PoolListing::default();

        for page in 1..=self.max_pages {
            let raw: Value = self.http.get_json(&self.page_url(page)).await?;
            let (records, total) = parse_listing_page(&raw)?;
            let fetched = records.len();

            listing.total = total;
            listing.records.extend(records);
            listing.raw_pages.push(raw);

            tracing::debug!("  page {}: {} records ({} of {})", page, fetched, listing.records.len(), total);

            if fetched == 0 || listing.records.len() as u64 >= total {
                break;
            }
        }

        Ok(listing)
    }
}
