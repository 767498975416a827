use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One tick from the price feed.
///
/// Carries a full snapshot of the forming bucket (open/high/low/close/volume
/// are the bucket's running values, the way exchange kline streams report
/// them), not a delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceUpdate {
    /// A well-formed update has finite prices and a finite, non-negative volume.
    pub fn is_well_formed(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
            && self.volume >= 0.0
    }
}

/// OHLCV candlestick for one fixed time bucket.
///
/// Mutable only while it is the current (unclosed) bucket inside the
/// aggregator; consumers only ever see finalized copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub bucket_start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// High/low envelope invariants: high >= max(open, close),
    /// low <= min(open, close), high >= low.
    pub fn is_well_formed(&self) -> bool {
        self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.high >= self.low
            && self.volume >= 0.0
    }

    /// Intrabar range, used as the volatility unit for support/resistance.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Trading signal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

/// MACD values: line, signal line and histogram (line - signal)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Stochastic RSI: %K and its 3-period smoothing %D
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochRsi {
    pub k: f64,
    pub d: f64,
}

/// Complete technical picture derived from the candle close series.
///
/// Always fully populated: indicators below their warm-up length report
/// neutral defaults instead of being absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub ma50: f64,
    pub ema20: f64,
    pub ema50: f64,
    pub macd: Macd,
    pub stoch_rsi: StochRsi,
}

/// A directional recommendation produced by a signal provider.
///
/// Immutable value: produced fresh on each evaluation, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal: SignalType,
    /// 0..=99, saturating. Deterministic function of the inputs.
    pub confidence: u8,
    pub trend: Trend,
    pub support: f64,
    pub resistance: f64,
    pub suggested_sl: Option<f64>,
    pub suggested_tp: Option<f64>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// +1 for long, -1 for short; multiplies price excursions into P&L.
    pub fn direction(&self) -> f64 {
        match self {
            TradeSide::Buy => 1.0,
            TradeSide::Sell => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
}

/// Lifecycle of a trade's stop-loss ratchet.
///
/// Risked: stop at initial distance. Secured: stop moved to entry, then
/// trailed. Closed: terminal, the trade is immutable from here on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradePhase {
    Risked,
    Secured,
    Closed(CloseReason),
}

/// News impact level consumed by the execution gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsImpact {
    None,
    Medium,
    High,
}

/// A single trade with its ratchet state.
///
/// The risk parameters are frozen at creation from the active trading mode;
/// later mode switches never touch running trades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub side: TradeSide,
    pub entry_price: f64,
    pub lot_size: f64,
    pub sl_price: f64,
    pub initial_sl_price: f64,
    pub tp_price: Option<f64>,
    /// Best price seen in the trade's favor: max for Buy, min for Sell.
    pub highest_favorable: f64,
    pub phase: TradePhase,
    pub exit_price: Option<f64>,
    pub profit: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// |entry - initial stop|, the risk unit for the breakeven trigger.
    pub initial_risk_distance: f64,
    pub breakeven_trigger_fraction: f64,
    pub trail_gap: f64,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        !matches!(self.phase, TradePhase::Closed(_))
    }

    pub fn is_secured(&self) -> bool {
        matches!(self.phase, TradePhase::Secured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_well_formed() {
        let candle = Candle {
            bucket_start: Utc::now(),
            open: 2350.0,
            high: 2352.0,
            low: 2349.0,
            close: 2351.0,
            volume: 1000.0,
        };
        assert!(candle.is_well_formed());
        assert!((candle.range() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_candle_rejects_inverted_envelope() {
        let candle = Candle {
            bucket_start: Utc::now(),
            open: 2350.0,
            high: 2349.0, // below open
            low: 2349.0,
            close: 2350.0,
            volume: 0.0,
        };
        assert!(!candle.is_well_formed());
    }

    #[test]
    fn test_update_rejects_nan() {
        let update = PriceUpdate {
            timestamp: Utc::now(),
            open: 2350.0,
            high: f64::NAN,
            low: 2349.0,
            close: 2350.0,
            volume: 10.0,
        };
        assert!(!update.is_well_formed());
    }

    #[test]
    fn test_side_direction() {
        assert_eq!(TradeSide::Buy.direction(), 1.0);
        assert_eq!(TradeSide::Sell.direction(), -1.0);
    }

    #[test]
    fn test_phase_open_states() {
        assert!(!TradePhase::Closed(CloseReason::StopLoss).eq(&TradePhase::Risked));
        let trade = Trade {
            id: Uuid::new_v4(),
            side: TradeSide::Buy,
            entry_price: 2350.0,
            lot_size: 1.0,
            sl_price: 2347.0,
            initial_sl_price: 2347.0,
            tp_price: None,
            highest_favorable: 2350.0,
            phase: TradePhase::Risked,
            exit_price: None,
            profit: 0.0,
            opened_at: Utc::now(),
            closed_at: None,
            initial_risk_distance: 3.0,
            breakeven_trigger_fraction: 0.5,
            trail_gap: 2.0,
        };
        assert!(trade.is_open());
        assert!(!trade.is_secured());
    }
}
