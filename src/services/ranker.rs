use crate::config::RankingConfig;
use crate::models::{BusinessLine, PoolRecord, RankingSet};

/// Builds the top-N views over the classified record set.
#[derive(Debug, Clone)]
pub struct PoolRanker {
    top_n: usize,
    tvl_floor: f64,
}

/// Stable descending sort by `metric`; equal values keep source order.
fn rank_by<'a, F>(pools: impl Iterator<Item = &'a PoolRecord>, metric: F) -> Vec<&'a PoolRecord>
where
    F: Fn(&PoolRecord) -> f64,
{
    let mut ranked: Vec<&PoolRecord> = pools.collect();
    ranked.sort_by(|a, b| metric(b).total_cmp(&metric(a)));
    ranked
}

impl PoolRanker {
    pub fn new(config: &RankingConfig) -> Self {
        Self {
            top_n: config.top_n,
            tvl_floor: config.tvl_floor,
        }
    }

    fn top<'a, F>(&self, pools: impl Iterator<Item = &'a PoolRecord>, metric: F) -> Vec<&'a PoolRecord>
    where
        F: Fn(&PoolRecord) -> f64,
    {
        let mut ranked = rank_by(pools, metric);
        ranked.truncate(self.top_n);
        ranked
    }

    pub fn rank<'a>(&self, records: &'a [PoolRecord]) -> RankingSet<'a> {
        // Yield views drop near-empty pools before truncating
        let floor = self.tvl_floor;
        let above_floor = move || records.iter().filter(move |p| p.tvl > floor);

        RankingSet {
            by_tvl: self.top(records.iter(), |p| p.tvl),
            by_volume: self.top(records.iter(), |p| p.volume_24h),
            by_fee_to_tvl: self.top(above_floor(), |p| p.fee_to_tvl),
            by_fee_apr: self.top(above_floor(), |p| p.fee_apr),
        }
    }

    /// Every tokenized-equity pool, largest TVL first.
    pub fn tokenized_equity<'a>(&self, records: &'a [PoolRecord]) -> Vec<&'a PoolRecord> {
        rank_by(
            records.iter().filter(|p| p.business_line == BusinessLine::TokenizedEquity),
            |p| p.tvl,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(address: &str, tvl: f64, volume: f64, ftv: f64, apr: f64) -> PoolRecord {
        PoolRecord {
            address: address.to_string(),
            tvl,
            volume_24h: volume,
            fee_to_tvl: ftv,
            fee_apr: apr,
            ..Default::default()
        }
    }

    fn addresses(view: &[&PoolRecord]) -> Vec<String> {
        view.iter().map(|p| p.address.clone()).collect()
    }

    fn ranker() -> PoolRanker {
        PoolRanker::new(&RankingConfig::default())
    }

    #[test]
    fn views_sort_descending_and_cap_at_top_n() {
        let records: Vec<PoolRecord> = (0..40)
            .map(|i| pool(&format!("p{i}"), 1000.0 + i as f64, (40 - i) as f64, 0.0, 0.0))
            .collect();

        let rankings = ranker().rank(&records);
        assert_eq!(rankings.by_tvl.len(), 15);
        assert_eq!(rankings.by_tvl[0].address, "p39");
        assert_eq!(rankings.by_volume[0].address, "p0");
        assert!(rankings.by_tvl.windows(2).all(|w| w[0].tvl >= w[1].tvl));
    }

    #[test]
    fn ties_keep_source_order() {
        let records = vec![
            pool("a", 10.0, 5.0, 0.0, 0.0),
            pool("b", 20.0, 5.0, 0.0, 0.0),
            pool("c", 10.0, 5.0, 0.0, 0.0),
            pool("d", 10.0, 7.0, 0.0, 0.0),
        ];
        let rankings = ranker().rank(&records);
        assert_eq!(addresses(&rankings.by_tvl), ["b", "a", "c", "d"]);
        assert_eq!(addresses(&rankings.by_volume), ["d", "a", "b", "c"]);
    }

    #[test]
    fn ranking_is_reproducible() {
        let records: Vec<PoolRecord> = (0..30)
            .map(|i| pool(&format!("p{i}"), (i % 4) as f64 * 1000.0, (i % 3) as f64, (i % 5) as f64, 1.0))
            .collect();
        let r = ranker();
        assert_eq!(r.rank(&records), r.rank(&records));
    }

    #[test]
    fn yield_views_apply_floor_before_truncation() {
        // 20 tiny pools with huge yields precede 3 real ones
        let mut records: Vec<PoolRecord> = (0..20)
            .map(|i| pool(&format!("dust{i}"), 500.0, 0.0, 99.0, 99.0))
            .collect();
        records.push(pool("real1", 501.0, 0.0, 0.2, 0.3));
        records.push(pool("real2", 9000.0, 0.0, 0.5, 0.1));
        records.push(pool("real3", 700.0, 0.0, 0.1, 0.9));

        let rankings = ranker().rank(&records);
        assert_eq!(addresses(&rankings.by_fee_to_tvl), ["real2", "real1", "real3"]);
        assert_eq!(addresses(&rankings.by_fee_apr), ["real3", "real1", "real2"]);
        assert!(rankings.by_fee_apr.iter().all(|p| p.tvl > 500.0));
        // the unfiltered views still see the dust pools
        assert!(rankings.by_volume.iter().any(|p| p.address.starts_with("dust")));
    }

    #[test]
    fn views_borrow_the_record_set() {
        let records = vec![pool("only", 600.0, 1.0, 1.0, 1.0)];
        let rankings = ranker().rank(&records);
        assert!(std::ptr::eq(rankings.by_tvl[0], &records[0]));
    }

    #[test]
    fn tokenized_equity_board_is_uncapped() {
        let records: Vec<PoolRecord> = (0..20)
            .map(|i| PoolRecord {
                address: format!("x{i}"),
                business_line: if i % 2 == 0 { BusinessLine::TokenizedEquity } else { BusinessLine::Major },
                tvl: i as f64,
                ..Default::default()
            })
            .collect();
        let board = ranker().tokenized_equity(&records);
        assert_eq!(board.len(), 10);
        assert_eq!(board[0].address, "x18");
    }
}
