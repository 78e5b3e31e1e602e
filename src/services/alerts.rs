use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::config::AlertThresholds;
use crate::models::{
    Alert, AlertCategory, MarketIndicators, PlatformTotals, PoolRecord, Severity, StoredSnapshot,
};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Today's computed state as seen by the alert rules.
pub struct SnapshotInputs<'a> {
    pub platform: &'a PlatformTotals,
    pub records: &'a [PoolRecord],
    /// Tokenized-equity pools in board order
    pub tokenized_equity: &'a [&'a PoolRecord],
}

/// Day-over-day fractions; `None` without a usable prior value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlatformDeltas {
    pub tvl_change: Option<f64>,
    pub volume_change: Option<f64>,
}

impl PlatformDeltas {
    pub fn apply(&self, totals: &mut PlatformTotals) {
        totals.tvl_change = self.tvl_change;
        totals.volume_change = self.volume_change;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlertReport {
    pub alerts: Vec<Alert>,
    pub deltas: PlatformDeltas,
}

/// `(today - yesterday) / yesterday`, absent when there is nothing to divide by.
pub fn change_fraction(today: f64, yesterday: f64) -> Option<f64> {
    if yesterday > 0.0 {
        Some((today - yesterday) / yesterday)
    } else {
        None
    }
}

/// Compares today's snapshot with market indicators and the prior snapshot.
pub struct AlertEngine {
    thresholds: AlertThresholds,
}

impl AlertEngine {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// Rules run in a fixed order and the output keeps it:
    /// market, sentiment, tokenized equity, yield, incentive expiry,
    /// platform deltas, new pools.
    pub fn generate(
        &self,
        today: &SnapshotInputs<'_>,
        market: &MarketIndicators,
        yesterday: Option<&StoredSnapshot>,
        now: DateTime<Utc>,
    ) -> AlertReport {
        let mut alerts = Vec::new();

        self.market_volatility(market, &mut alerts);
        self.sentiment_extremes(market, &mut alerts);
        self.tokenized_equity_moves(today.tokenized_equity, &mut alerts);
        self.high_yield(today.records, &mut alerts);
        self.incentive_expiry(today.records, now, &mut alerts);

        let mut deltas = PlatformDeltas::default();
        if let Some(prior) = yesterday {
            deltas = self.platform_deltas(today.platform, &prior.platform, &mut alerts);
            Self::new_pools(today.records, &prior.pools, &mut alerts);
        }

        AlertReport { alerts, deltas }
    }

    fn market_volatility(&self, market: &MarketIndicators, alerts: &mut Vec<Alert>) {
        let key = &self.thresholds.reference_asset;
        let change = market.quote(key).map(|q| q.change_24h).unwrap_or(0.0);

        if change.abs() > self.thresholds.market_move_pct {
            let direction = if change > 0.0 { "surged" } else { "plunged" };
            alerts.push(Alert::new(
                Severity::for_move(change),
                AlertCategory::Market,
                format!(
                    "{} {} {:+.1}% in 24h, prepare related marketing content",
                    key.to_uppercase(),
                    direction,
                    change
                ),
            ));
        }
    }

    fn sentiment_extremes(&self, market: &MarketIndicators, alerts: &mut Vec<Alert>) {
        let Some(index) = &market.sentiment else {
            return;
        };

        if index.value < self.thresholds.extreme_fear {
            alerts.push(Alert::new(
                Severity::Green,
                AlertCategory::Market,
                format!("Fear & Greed = {} (extreme fear), prepare contrarian-opportunity content", index.value),
            ));
        } else if index.value > self.thresholds.extreme_greed {
            alerts.push(Alert::new(
                Severity::Orange,
                AlertCategory::Market,
                format!("Fear & Greed = {} (extreme greed), remind users to mind the risk", index.value),
            ));
        }
    }

    fn tokenized_equity_moves(&self, pools: &[&PoolRecord], alerts: &mut Vec<Alert>) {
        for pool in pools {
            let change = pool.price_change_24h;
            if change.abs() > self.thresholds.tokenized_equity_move {
                let direction = if change > 0.0 { "up" } else { "down" };
                alerts.push(Alert::new(
                    Severity::for_move(change),
                    AlertCategory::TokenizedEquity,
                    format!(
                        "{} {} {:.1}% in 24h, consider a tweet tying in the related news",
                        pool.name,
                        direction,
                        change.abs() * 100.0
                    ),
                ));
            }
        }
    }

    fn high_yield(&self, pools: &[PoolRecord], alerts: &mut Vec<Alert>) {
        for pool in pools {
            if pool.fee_apr > self.thresholds.high_apr && pool.tvl > self.thresholds.high_apr_min_tvl {
                alerts.push(Alert::new(
                    Severity::Orange,
                    AlertCategory::Pool,
                    format!("{} APR {:.0}%, keep it monitored", pool.name, pool.fee_apr * 100.0),
                ));
            }
        }
    }

    fn incentive_expiry(&self, pools: &[PoolRecord], now: DateTime<Utc>, alerts: &mut Vec<Alert>) {
        let now_ms = now.timestamp_millis();

        for pool in pools {
            let Some(incentive) = &pool.incentive else {
                continue;
            };
            if incentive.end_ts == 0 {
                continue;
            }

            let days = incentive.end_ts.saturating_sub(now_ms) as f64 / MS_PER_DAY;
            if days > 0.0 && days < self.thresholds.incentive_expiry_days {
                alerts.push(Alert::new(
                    Severity::Red,
                    AlertCategory::Reward,
                    format!("{} incentive ends in {:.0} days, remind the team to renew", pool.name, days),
                ));
            }
        }
    }

    fn platform_deltas(
        &self,
        today: &PlatformTotals,
        yesterday: &PlatformTotals,
        alerts: &mut Vec<Alert>,
    ) -> PlatformDeltas {
        let tvl_change = change_fraction(today.tvl, yesterday.tvl);
        let volume_change = change_fraction(today.volume_24h, yesterday.volume_24h);

        if let Some(change) = tvl_change {
            if change < self.thresholds.tvl_drop {
                alerts.push(Alert::new(
                    Severity::Red,
                    AlertCategory::Platform,
                    format!(
                        "Platform TVL down {:.1}% day over day, investigate the cause",
                        change.abs() * 100.0
                    ),
                ));
            }
        }

        PlatformDeltas { tvl_change, volume_change }
    }

    fn new_pools(today: &[PoolRecord], yesterday: &[PoolRecord], alerts: &mut Vec<Alert>) {
        let known: HashSet<&str> = yesterday.iter().map(|p| p.address.as_str()).collect();

        for pool in today {
            if !pool.address.is_empty() && !known.contains(pool.address.as_str()) {
                alerts.push(Alert::new(
                    Severity::Green,
                    AlertCategory::NewPool,
                    format!("New pool live: {}, prepare an introduction tweet", pool.name),
                ));
            }
        }
    }
}
