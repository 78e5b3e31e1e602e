pub mod aggregator;
pub mod alerts;
pub mod classifier;
pub mod collector;
pub mod notifier;
pub mod ranker;
pub mod storage;

pub use aggregator::PoolAggregator;
pub use alerts::AlertEngine;
pub use classifier::PoolClassifier;
pub use collector::{DailyCollector, Sources};
pub use notifier::LarkNotifier;
pub use ranker::PoolRanker;
pub use storage::SnapshotStore;
