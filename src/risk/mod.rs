// Risk policy module: trading-mode parameter table and the news gate
pub mod modes;

pub use modes::{required_confidence, RiskParams, TradingMode};
