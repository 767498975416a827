// Market data module: per-symbol candle aggregation and bounded history
pub mod aggregator;
pub mod history;

pub use aggregator::{CandleAggregator, FeedError};
pub use history::CandleHistory;
