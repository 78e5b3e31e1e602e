use crate::models::{BusinessLine, BusinessLineAggregate, BusinessLineBoard, PlatformTotals, PoolRecord};

/// Folds classified pools into platform totals and per-line aggregates.
#[derive(Debug, Clone)]
pub struct PoolAggregator {
    protocol_fee_share: f64,
}

impl PoolAggregator {
    pub fn new(protocol_fee_share: f64) -> Self {
        Self { protocol_fee_share }
    }

    /// Single pass over `records`. `total_pools` is the listing's own count,
    /// which may exceed the number of records actually returned.
    pub fn aggregate(&self, records: &[PoolRecord], total_pools: u64) -> (PlatformTotals, BusinessLineBoard) {
        let mut totals = PlatformTotals { total_pools, ..Default::default() };
        let mut board: BusinessLineBoard = BusinessLine::ALL.iter()
            .map(|line| (*line, BusinessLineAggregate::default()))
            .collect();

        for record in records {
            totals.tvl += record.tvl;
            totals.volume_24h += record.volume_24h;
            totals.volume_7d += record.volume_7d;
            totals.fee_24h += record.fee_24h;
            totals.fee_7d += record.fee_7d;
            if record.volume_24h > 0.0 {
                totals.active_pools += 1;
            }

            let line = board.entry(record.business_line).or_default();
            line.tvl += record.tvl;
            line.volume_24h += record.volume_24h;
            line.fee_24h += record.fee_24h;
            line.count += 1;
        }

        totals.revenue_24h = totals.fee_24h * self.protocol_fee_share;

        (totals, board)
    }
}

/// Percentage of platform TVL held by one line; zero when the platform holds nothing.
pub fn tvl_share(line_tvl: f64, platform_tvl: f64) -> f64 {
    if platform_tvl > 0.0 {
        line_tvl / platform_tvl * 100.0
    } else {
        0.0
    }
}
