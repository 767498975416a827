use serde::{Deserialize, Serialize};

use crate::models::NewsImpact;

/// Confidence floor applied when high-impact news is active and the
/// news-avoidance switch is on
const NEWS_CONFIDENCE_FLOOR: u8 = 98;

/// Trading mode selected by the operator.
///
/// Each mode is a fixed bundle of risk parameters; switching modes affects
/// trades opened afterwards, never running ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum TradingMode {
    Regular,
    Safe,
    UltraSafe,
    Scalping,
    Swing,
}

/// Concrete risk numbers for one trading mode.
///
/// Distances are in instrument points (price units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub stop_loss_points: f64,
    pub take_profit_points: Option<f64>,
    /// Fraction of the initial risk distance the price must move in the
    /// trade's favor before the stop jumps to breakeven
    pub breakeven_trigger_fraction: f64,
    /// Distance kept between the best favorable price and the trailed stop
    pub trail_gap_points: f64,
    /// Minimum signal confidence the executor demands to open a trade
    pub confidence_threshold: u8,
}

impl TradingMode {
    /// The canonical parameter table.
    pub fn risk_params(&self) -> RiskParams {
        match self {
            TradingMode::Regular => RiskParams {
                stop_loss_points: 5.0,
                take_profit_points: Some(7.5),
                breakeven_trigger_fraction: 0.5,
                trail_gap_points: 3.0,
                confidence_threshold: 75,
            },
            TradingMode::Safe => RiskParams {
                stop_loss_points: 3.0,
                take_profit_points: Some(3.6),
                breakeven_trigger_fraction: 0.35,
                trail_gap_points: 1.5,
                confidence_threshold: 85,
            },
            TradingMode::UltraSafe => RiskParams {
                stop_loss_points: 2.0,
                take_profit_points: Some(2.0),
                breakeven_trigger_fraction: 0.25,
                trail_gap_points: 0.8,
                confidence_threshold: 95,
            },
            TradingMode::Scalping => RiskParams {
                stop_loss_points: 3.0,
                take_profit_points: Some(6.0),
                breakeven_trigger_fraction: 0.5,
                trail_gap_points: 2.0,
                confidence_threshold: 80,
            },
            TradingMode::Swing => RiskParams {
                stop_loss_points: 10.0,
                take_profit_points: Some(25.0),
                breakeven_trigger_fraction: 0.5,
                trail_gap_points: 6.0,
                confidence_threshold: 70,
            },
        }
    }
}

impl Default for TradingMode {
    fn default() -> Self {
        TradingMode::UltraSafe
    }
}

/// Confidence a signal must reach to be executed, given the news situation.
///
/// High-impact news with avoidance enabled raises the bar to 98 regardless
/// of mode; otherwise the mode's own threshold applies.
pub fn required_confidence(mode: TradingMode, avoid_news: bool, news: NewsImpact) -> u8 {
    let base = mode.risk_params().confidence_threshold;
    if avoid_news && news == NewsImpact::High {
        base.max(NEWS_CONFIDENCE_FLOOR)
    } else {
        base
    }
}
