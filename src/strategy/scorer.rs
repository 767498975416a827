use async_trait::async_trait;

use crate::models::{Candle, IndicatorSnapshot, Signal, SignalType, Trend};
use crate::strategy::SignalProvider;
use crate::Result;

/// Weights and thresholds for the deterministic fallback scorer
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// RSI below this scores toward Buy
    pub rsi_buy_below: f64,
    /// RSI above this scores toward Sell
    pub rsi_sell_above: f64,
    pub rsi_weight: f64,
    pub macd_weight: f64,
    pub trend_weight: f64,
    pub stoch_weight: f64,
    pub stoch_oversold: f64,
    pub stoch_overbought: f64,
    /// |score| must reach this to leave Hold
    pub decision_threshold: f64,
    /// Support/resistance distance in units of the last candle's range
    pub level_range_mult: f64,
    /// Suggested stop distance in range units; take-profit is 1.5x that
    pub sl_range_mult: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            rsi_buy_below: 45.0,
            rsi_sell_above: 55.0,
            rsi_weight: 3.5,
            macd_weight: 2.0,
            trend_weight: 1.5,
            stoch_weight: 1.0,
            stoch_oversold: 30.0,
            stoch_overbought: 70.0,
            decision_threshold: 2.5,
            level_range_mult: 2.0,
            sl_range_mult: 3.0,
        }
    }
}

/// Map an indicator snapshot and the last candle to a trading signal.
///
/// Pure and deterministic: no I/O, no randomness, never fails. The same
/// inputs always produce the same signal, confidence included.
pub fn score(snapshot: &IndicatorSnapshot, last: &Candle, config: &ScorerConfig) -> Signal {
    let mut score = 0.0;
    let mut factors: Vec<String> = Vec::new();

    // RSI displacement from the neutral band
    if snapshot.rsi < config.rsi_buy_below {
        score += config.rsi_weight;
        factors.push(format!("RSI {:.1} below {:.0}", snapshot.rsi, config.rsi_buy_below));
    } else if snapshot.rsi > config.rsi_sell_above {
        score -= config.rsi_weight;
        factors.push(format!("RSI {:.1} above {:.0}", snapshot.rsi, config.rsi_sell_above));
    }

    // MACD histogram sign aligned with the line/signal crossover
    if snapshot.macd.histogram > 0.0 && snapshot.macd.macd > snapshot.macd.signal {
        score += config.macd_weight;
        factors.push("MACD bullish crossover".to_string());
    } else if snapshot.macd.histogram < 0.0 && snapshot.macd.macd < snapshot.macd.signal {
        score -= config.macd_weight;
        factors.push("MACD bearish crossover".to_string());
    }

    // EMA trend alignment
    let trend = if snapshot.ema20 > snapshot.ema50 {
        score += config.trend_weight;
        factors.push("EMA20 above EMA50".to_string());
        Trend::Up
    } else if snapshot.ema20 < snapshot.ema50 {
        score -= config.trend_weight;
        factors.push("EMA20 below EMA50".to_string());
        Trend::Down
    } else {
        Trend::Sideways
    };

    // Stochastic RSI extremity
    if snapshot.stoch_rsi.k < config.stoch_oversold {
        score += config.stoch_weight;
        factors.push(format!("StochRSI %K {:.0} oversold", snapshot.stoch_rsi.k));
    } else if snapshot.stoch_rsi.k > config.stoch_overbought {
        score -= config.stoch_weight;
        factors.push(format!("StochRSI %K {:.0} overbought", snapshot.stoch_rsi.k));
    }

    let signal_type = if score >= config.decision_threshold {
        SignalType::Buy
    } else if score <= -config.decision_threshold {
        SignalType::Sell
    } else {
        SignalType::Hold
    };

    let confidence = confidence_for(signal_type, score);

    // Levels scale with the last candle's realized range, floored so a
    // doji still produces distinct levels
    let close = last.close;
    let range = last.range().max(close.abs() * 0.0005);
    let support = close - config.level_range_mult * range;
    let resistance = close + config.level_range_mult * range;

    let (suggested_sl, suggested_tp) = match signal_type {
        SignalType::Buy => (
            Some(close - config.sl_range_mult * range),
            Some(close + config.sl_range_mult * range * 1.5),
        ),
        SignalType::Sell => (
            Some(close + config.sl_range_mult * range),
            Some(close - config.sl_range_mult * range * 1.5),
        ),
        SignalType::Hold => (None, None),
    };

    let reasoning = if factors.is_empty() {
        format!("No factors fired (score {:.1}); holding", score)
    } else {
        format!(
            "{} (score {:+.1} => {:?}, confidence {}%)",
            factors.join("; "),
            score,
            signal_type,
            confidence
        )
    };

    Signal {
        signal: signal_type,
        confidence,
        trend,
        support,
        resistance,
        suggested_sl,
        suggested_tp,
        reasoning,
    }
}

/// Monotonic, saturating confidence map: 90 + 2 points per score unit,
/// capped at 99; setups with |score| >= 3 are floored at 96. Hold carries a
/// nominal 75 that nothing gates on.
fn confidence_for(signal_type: SignalType, score: f64) -> u8 {
    if signal_type == SignalType::Hold {
        return 75;
    }
    let mut confidence = (90.0 + score.abs() * 2.0).min(99.0);
    if score.abs() >= 3.0 {
        confidence = confidence.max(96.0);
    }
    confidence.floor() as u8
}

/// The always-available signal source: wraps [`score`] behind the provider
/// trait. Its `analyze` never returns `Err`.
#[derive(Debug, Clone, Default)]
pub struct LocalHeuristicProvider {
    config: ScorerConfig,
}

impl LocalHeuristicProvider {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SignalProvider for LocalHeuristicProvider {
    async fn analyze(&self, snapshot: &IndicatorSnapshot, recent: &[Candle]) -> Result<Signal> {
        let Some(last) = recent.last() else {
            // No candles yet: a neutral, zero-confidence hold
            return Ok(Signal {
                signal: SignalType::Hold,
                confidence: 0,
                trend: Trend::Sideways,
                support: 0.0,
                resistance: 0.0,
                suggested_sl: None,
                suggested_tp: None,
                reasoning: "Insufficient data for analysis".to_string(),
            });
        };
        Ok(score(snapshot, last, &self.config))
    }

    fn name(&self) -> &str {
        "local-heuristic"
    }
}
