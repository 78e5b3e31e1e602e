use serde::{Deserialize, Serialize};
use std::fmt;

/// Business line a pool is classified into. Every pool belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum BusinessLine {
    #[serde(rename = "xStocks")]
    TokenizedEquity,
    #[serde(rename = "Gold_RWA")]
    GoldRwa,
    Stablecoin,
    Major,
    #[default]
    Other,
}

impl BusinessLine {
    pub const ALL: [BusinessLine; 5] = [
        BusinessLine::TokenizedEquity,
        BusinessLine::GoldRwa,
        BusinessLine::Stablecoin,
        BusinessLine::Major,
        BusinessLine::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessLine::TokenizedEquity => "xStocks",
            BusinessLine::GoldRwa => "Gold_RWA",
            BusinessLine::Stablecoin => "Stablecoin",
            BusinessLine::Major => "Major",
            BusinessLine::Other => "Other",
        }
    }
}

impl fmt::Display for BusinessLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active liquidity incentive attached to a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Incentive {
    pub symbol: String,
    pub apr: f64,
    /// Unix milliseconds, 0 when the source did not report one
    #[serde(rename = "endTs")]
    pub end_ts: i64,
    /// Display string as reported by the source
    #[serde(rename = "dailyAmount")]
    pub daily_amount: String,
}

/// One liquidity pool at collection time.
///
/// Field names on the wire follow the dashboard's summary format so that
/// documents written by earlier runs stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PoolRecord {
    #[serde(rename = "addr")]
    pub address: String,
    pub name: String,
    #[serde(rename = "baseSym")]
    pub base_symbol: String,
    #[serde(rename = "quoteSym")]
    pub quote_symbol: String,
    #[serde(rename = "baseLogo")]
    pub base_logo: String,
    #[serde(rename = "quoteLogo")]
    pub quote_logo: String,
    #[serde(rename = "cat")]
    pub category: i64,
    #[serde(rename = "biz")]
    pub business_line: BusinessLine,
    pub tvl: f64,
    #[serde(rename = "v1h")]
    pub volume_1h: f64,
    #[serde(rename = "v24h")]
    pub volume_24h: f64,
    #[serde(rename = "v7d")]
    pub volume_7d: f64,
    #[serde(rename = "f24h")]
    pub fee_24h: f64,
    #[serde(rename = "f7d")]
    pub fee_7d: f64,
    #[serde(rename = "apr")]
    pub fee_apr: f64,
    #[serde(rename = "ftv")]
    pub fee_to_tvl: f64,
    #[serde(rename = "px")]
    pub price: f64,
    #[serde(rename = "pc1h")]
    pub price_change_1h: f64,
    #[serde(rename = "pc1d")]
    pub price_change_24h: f64,
    #[serde(rename = "pc7d")]
    pub price_change_7d: f64,
    pub bonus: f64,
    #[serde(rename = "reward")]
    pub incentive: Option<Incentive>,
    pub kline7d: Vec<f64>,
    pub kline1d: Vec<f64>,
}

impl PoolRecord {
    /// Display name from the symbol pair, `?` standing in for a missing side.
    pub fn display_name(base: &str, quote: &str) -> String {
        let side = |s: &str| if s.is_empty() { "?".to_string() } else { s.to_string() };
        format!("{}-{}", side(base), side(quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_marks_missing_symbols() {
        assert_eq!(PoolRecord::display_name("SOL", "USDC"), "SOL-USDC");
        assert_eq!(PoolRecord::display_name("", "USDC"), "?-USDC");
    }

    #[test]
    fn record_uses_dashboard_keys() {
        let record = PoolRecord {
            address: "pool1".into(),
            business_line: BusinessLine::TokenizedEquity,
            fee_apr: 0.4,
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["addr"], "pool1");
        assert_eq!(json["biz"], "xStocks");
        assert_eq!(json["apr"], 0.4);
        assert!(json["reward"].is_null());
    }

    #[test]
    fn sparse_record_deserializes_with_zeroes() {
        let record: PoolRecord = serde_json::from_str(r#"{"addr":"abc","biz":"Gold_RWA"}"#).unwrap();
        assert_eq!(record.address, "abc");
        assert_eq!(record.business_line, BusinessLine::GoldRwa);
        assert_eq!(record.tvl, 0.0);
        assert!(record.incentive.is_none());
    }
}
