// Core modules
pub mod backtest;
pub mod execution;
pub mod indicators;
pub mod market;
pub mod models;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use models::*;
pub use strategy::SignalProvider;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
