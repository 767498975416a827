// Technical indicators module
// Implements RSI, SMA/EMA, MACD and Stochastic RSI over candle closes

pub mod engine;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod stoch_rsi;

pub use engine::IndicatorEngine;
pub use macd::{calculate_macd, MacdState};
pub use moving_average::{calculate_ema, calculate_ema_series, calculate_sma, EmaState};
pub use rsi::{calculate_rsi, calculate_rsi_series, WilderRsi};
pub use stoch_rsi::{calculate_stoch_rsi, StochRsiState};
